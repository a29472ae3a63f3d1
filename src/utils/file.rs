use crate::config::formats;

/// Nome suggerito al client: il suffisso `.pdf` finale diventa `.docx`
pub fn docx_download_name(filename: &str) -> String {
    let stem = filename
        .strip_suffix(&format!(".{}", formats::INPUT_EXTENSION))
        .unwrap_or(filename);
    format!("{}.{}", stem, formats::OUTPUT_EXTENSION)
}

/// Valore `Content-Disposition` per il download.
///
/// `filename` contiene solo ASCII stampabile (gli altri caratteri diventano
/// `_`), `filename*` porta il nome originale in UTF-8 percent-encoded.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if fallback == filename {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(filename)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docx_download_name() {
        assert_eq!(docx_download_name("report.pdf"), "report.docx");
        assert_eq!(docx_download_name("my.pdf.notes.pdf"), "my.pdf.notes.docx");
        assert_eq!(docx_download_name(".pdf"), ".docx");
    }

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("report.docx"),
            "attachment; filename=\"report.docx\""
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let value = content_disposition("relazione è.docx");
        assert!(value.starts_with("attachment; filename=\"relazione _.docx\""));
        assert!(value.ends_with("filename*=UTF-8''relazione%20%C3%A8.docx"));
    }

    #[test]
    fn test_content_disposition_escapes_quotes() {
        let value = content_disposition("a\"b.docx");
        assert!(value.contains("filename=\"a_b.docx\""));
        assert!(value.contains("filename*=UTF-8''a%22b.docx"));
    }
}
