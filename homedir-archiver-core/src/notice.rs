//! The retrieval notice dropped into a directory before its contents are
//! deleted.

/// Render the notice body. `location` is the full remote location of the
/// archive and must be quoted verbatim in any retrieval request.
pub fn render_notice(location: &str) -> String {
    format!(
        "\nYour files have been archived due to inactivity.\n\n\
         To retrieve a copy of your files, open a data archival\n\
         request with your support team.\n\n\
         The following text is the location of your archive,\n\
         it must be included with your request:\n\n\
         {location}\n"
    )
}
