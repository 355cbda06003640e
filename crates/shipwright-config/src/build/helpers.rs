use std::path::PathBuf;

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_output_root() -> PathBuf {
    PathBuf::from(".tmp").join("public")
}

pub(crate) fn default_css_dir() -> String {
    "css".to_string()
}

pub(crate) fn default_js_dir() -> String {
    "js".to_string()
}

pub(crate) fn default_font_dir() -> String {
    "fonts".to_string()
}

pub(crate) fn default_image_dir() -> String {
    "images".to_string()
}

pub(crate) fn default_html_dir() -> String {
    "/".to_string()
}

pub(crate) fn default_manifest_marker() -> Vec<String> {
    vec![super::MANIFEST_FILE_NAME.to_string()]
}
