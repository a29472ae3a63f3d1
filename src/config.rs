use std::path::PathBuf;
use std::time::Duration;

/// Cosa fare con gli artefatti di un job riuscito dopo l'invio della risposta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRetention {
    /// Restano su disco finche' il reaper o lo shutdown non li rimuovono
    Keep,
    /// Rimossi appena il file di output e' stato aperto per lo streaming
    DeleteAfterSend,
}

impl OutputRetention {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "keep" => Some(Self::Keep),
            "delete" | "delete-after-send" => Some(Self::DeleteAfterSend),
            _ => None,
        }
    }
}

/// Motore di conversione preconfigurato
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterPreset {
    /// `pdf2docx convert {input} {output}`
    Pdf2Docx,
    /// LibreOffice headless (`soffice`)
    LibreOffice,
}

impl ConverterPreset {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pdf2docx" => Some(Self::Pdf2Docx),
            "libreoffice" | "soffice" => Some(Self::LibreOffice),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size_mb: u64,
    pub scratch_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    pub converter: ConverterPreset,
    /// Sostituisce il programma del preset
    pub converter_program: Option<String>,
    /// Sostituisce gli argomenti del preset
    pub converter_args: Option<Vec<String>>,
    pub output_retention: OutputRetention,
    pub artifact_max_age_hours: u64,
    pub reap_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_file_size_mb: 50,
            scratch_dir: std::env::temp_dir().join("pdf2word"),
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            converter: ConverterPreset::Pdf2Docx,
            converter_program: None,
            converter_args: None,
            output_retention: OutputRetention::Keep,
            artifact_max_age_hours: 24,
            reap_interval_secs: 3600,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Costruisce la configurazione da una sorgente chiave/valore arbitraria
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("PDF2WORD_HOST") {
            config.host = host;
        }

        if let Some(port) = lookup("PDF2WORD_PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }

        if let Some(size) = lookup("PDF2WORD_MAX_FILE_SIZE_MB") {
            if let Ok(s) = size.parse() {
                config.max_file_size_mb = s;
            }
        }

        if let Some(dir) = lookup("PDF2WORD_SCRATCH_DIR") {
            config.scratch_dir = PathBuf::from(dir);
        }

        if let Some(origins) = lookup("PDF2WORD_ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some(preset) = lookup("PDF2WORD_CONVERTER") {
            if let Some(p) = ConverterPreset::parse(&preset) {
                config.converter = p;
            }
        }

        if let Some(program) = lookup("PDF2WORD_CONVERTER_PROGRAM") {
            if !program.trim().is_empty() {
                config.converter_program = Some(program.trim().to_string());
            }
        }

        if let Some(args) = lookup("PDF2WORD_CONVERTER_ARGS") {
            config.converter_args = Some(split_args(&args));
        }

        if let Some(retention) = lookup("PDF2WORD_OUTPUT_RETENTION") {
            if let Some(r) = OutputRetention::parse(&retention) {
                config.output_retention = r;
            }
        }

        if let Some(hours) = lookup("PDF2WORD_ARTIFACT_MAX_AGE_HOURS") {
            if let Ok(h) = hours.parse() {
                config.artifact_max_age_hours = h;
            }
        }

        if let Some(secs) = lookup("PDF2WORD_REAP_INTERVAL_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                if s > 0 {
                    config.reap_interval_secs = s;
                }
            }
        }

        config
    }

    /// `None` quando il reaper e' disabilitato
    pub fn artifact_max_age(&self) -> Option<Duration> {
        if self.artifact_max_age_hours == 0 {
            None
        } else {
            Some(Duration::from_secs(self.artifact_max_age_hours * 3600))
        }
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

/// Limite del body in byte; satura invece di andare in overflow
pub fn body_limit_bytes(max_file_size_mb: u64) -> usize {
    usize::try_from(max_file_size_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
}

fn split_args(template: &str) -> Vec<String> {
    template.split_whitespace().map(|s| s.to_string()).collect()
}

// Formati supportati
pub mod formats {
    pub const INPUT_EXTENSION: &str = "pdf";
    pub const OUTPUT_EXTENSION: &str = "docx";

    pub const DOCX_CONTENT_TYPE: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

    /// Il nome dichiarato deve terminare esattamente con `.pdf`
    pub fn is_pdf_upload(filename: &str) -> bool {
        filename.ends_with(".pdf")
    }
}
