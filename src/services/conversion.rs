//! Upload → convert → respond lifecycle

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::{formats, OutputRetention};
use crate::error::{AppError, Result};
use crate::models::{ConversionJob, JobState};
use crate::services::converter::DocumentConverter;
use crate::services::scratch::{remove_quietly, ArtifactGuard, ScratchDir};
use crate::utils::docx_download_name;

/// Risultato di un job riuscito, pronto per lo streaming
#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    pub token: Uuid,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub download_name: String,
    pub upload_size: u64,
}

#[derive(Clone)]
pub struct ConversionService {
    converter: Arc<dyn DocumentConverter>,
    scratch: ScratchDir,
    retention: OutputRetention,
}

impl ConversionService {
    pub fn new(converter: Arc<dyn DocumentConverter>, scratch: ScratchDir) -> Self {
        Self {
            converter,
            scratch,
            retention: OutputRetention::Keep,
        }
    }

    pub fn with_retention(mut self, retention: OutputRetention) -> Self {
        self.retention = retention;
        self
    }

    /// Converte un upload PDF in DOCX.
    ///
    /// Il nome viene validato prima di qualsiasi accesso al filesystem. In caso
    /// di errore entrambi gli artefatti del job vengono rimossi, anche quando
    /// il chiamante abbandona la richiesta. Lo stream di upload viene
    /// consumato (e rilasciato) prima del ritorno.
    pub async fn convert<S>(&self, filename: &str, upload: S) -> Result<ConvertedDocument>
    where
        S: Stream<Item = Result<Bytes>>,
    {
        if !formats::is_pdf_upload(filename) {
            return Err(AppError::InvalidInput);
        }

        tracing::info!("File ricevuto: {}", filename);

        let mut job = self.scratch.new_job();
        job.advance(JobState::Validated);
        let guard = self.scratch.guard(&job);

        match self.run(&mut job, guard, upload).await {
            Ok(upload_size) => {
                job.advance(JobState::Succeeded);
                tracing::info!(
                    "Conversione completata: {} -> {}",
                    filename,
                    job.output_path.display()
                );
                Ok(ConvertedDocument {
                    token: job.token,
                    input_path: job.input_path,
                    output_path: job.output_path,
                    download_name: docx_download_name(filename),
                    upload_size,
                })
            }
            Err(e) => {
                job.advance(JobState::Failed);
                tracing::error!("Errore durante la conversione di {}: {}", filename, e);
                Err(e)
            }
        }
    }

    async fn run<S>(&self, job: &mut ConversionJob, guard: ArtifactGuard, upload: S) -> Result<u64>
    where
        S: Stream<Item = Result<Bytes>>,
    {
        self.scratch.ensure()?;

        tracing::info!("Salvataggio file in: {}", job.input_path.display());
        let upload_size = save_upload(&job.input_path, upload).await?;
        job.advance(JobState::Saved);

        tracing::info!(
            "Conversione con {}: {} -> {}",
            self.converter.name(),
            job.input_path.display(),
            job.output_path.display()
        );
        job.advance(JobState::Converting);

        // Il guard passa al task: se la richiesta viene abbandonata il motore
        // termina comunque e un fallimento rimuove gli artefatti.
        let converter = Arc::clone(&self.converter);
        let input = job.input_path.clone();
        let output = job.output_path.clone();
        tokio::spawn(async move {
            // Il motore e' bloccante: fuori dai worker tokio
            let result: Result<()> =
                match tokio::task::spawn_blocking(move || converter.convert(&input, &output)).await {
                    Ok(outcome) => outcome.map_err(AppError::from),
                    Err(e) => Err(AppError::ConversionFailed(format!(
                        "conversion task aborted: {}",
                        e
                    ))),
                };
            if result.is_ok() {
                guard.disarm();
            }
            result
        })
        .await
        .map_err(|e| AppError::ConversionFailed(format!("conversion task aborted: {}", e)))??;

        Ok(upload_size)
    }

    /// Apre il file convertito per lo streaming, applicando la politica di
    /// retention.
    pub async fn open_output(&self, doc: &ConvertedDocument) -> Result<tokio::fs::File> {
        let file = match tokio::fs::File::open(&doc.output_path).await {
            Ok(file) => file,
            Err(e) => {
                remove_quietly(&doc.input_path);
                remove_quietly(&doc.output_path);
                return Err(e.into());
            }
        };

        if self.retention == OutputRetention::DeleteAfterSend {
            // L'handle aperto continua a servire il contenuto (Unix); altrove
            // la rimozione puo' fallire e il file resta al reaper.
            remove_quietly(&doc.input_path);
            remove_quietly(&doc.output_path);
        }

        Ok(file)
    }
}

async fn save_upload<S>(path: &Path, upload: S) -> Result<u64>
where
    S: Stream<Item = Result<Bytes>>,
{
    futures::pin_mut!(upload);

    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = upload.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::converter::ConversionError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct CopyConverter;

    impl DocumentConverter for CopyConverter {
        fn name(&self) -> &str {
            "copy"
        }

        fn convert(&self, input: &Path, output: &Path) -> std::result::Result<(), ConversionError> {
            let mut data = b"DOCX:".to_vec();
            data.extend(std::fs::read(input)?);
            std::fs::write(output, data)?;
            Ok(())
        }
    }

    struct FailingConverter;

    impl DocumentConverter for FailingConverter {
        fn name(&self) -> &str {
            "failing"
        }

        fn convert(&self, _input: &Path, output: &Path) -> std::result::Result<(), ConversionError> {
            // output parziale che deve sparire
            std::fs::write(output, b"half")?;
            Err(ConversionError::Failed("unexpected EOF in xref".to_string()))
        }
    }

    /// Scrive un output parziale e fallisce dopo un po'
    struct SlowFailingConverter;

    impl DocumentConverter for SlowFailingConverter {
        fn name(&self) -> &str {
            "slow-failing"
        }

        fn convert(&self, _input: &Path, output: &Path) -> std::result::Result<(), ConversionError> {
            std::fs::write(output, b"half")?;
            std::thread::sleep(std::time::Duration::from_millis(200));
            Err(ConversionError::Failed("timeout in page 3".to_string()))
        }
    }

    /// Segnala quando lo stream che lo possiede viene rilasciato
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn flagged_chunks(
        parts: &[&'static [u8]],
        released: &Arc<AtomicBool>,
    ) -> impl Stream<Item = Result<Bytes>> {
        let flag = DropFlag(Arc::clone(released));
        chunks(parts).map(move |chunk| {
            let _held = &flag;
            chunk
        })
    }

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes>> {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(*p)))
                .collect::<Vec<_>>(),
        )
    }

    fn scratch_files(scratch: &ScratchDir) -> usize {
        std::fs::read_dir(scratch.path())
            .map(|d| d.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_successful_conversion() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path().join("scratch"));
        let service = ConversionService::new(Arc::new(CopyConverter), scratch);

        let doc = service
            .convert("report.pdf", chunks(&[b"%PDF-", b"1.7"]))
            .await
            .unwrap();

        assert_eq!(doc.download_name, "report.docx");
        assert_eq!(doc.upload_size, 8);
        assert_eq!(std::fs::read(&doc.input_path).unwrap(), b"%PDF-1.7");
        assert_eq!(std::fs::read(&doc.output_path).unwrap(), b"DOCX:%PDF-1.7");
        assert!(doc
            .output_path
            .ends_with(format!("{}.docx", doc.token)));
    }

    #[tokio::test]
    async fn test_rejects_non_pdf_without_touching_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path().join("scratch"));
        let service = ConversionService::new(Arc::new(CopyConverter), scratch.clone());

        let err = service
            .convert("image.png", chunks(&[b"png"]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput));
        assert!(!scratch.path().exists());
    }

    #[tokio::test]
    async fn test_failure_cleans_up_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path().join("scratch"));
        let service = ConversionService::new(Arc::new(FailingConverter), scratch.clone());

        let err = service
            .convert("broken.pdf", chunks(&[b"garbage"]))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Conversion failed: unexpected EOF in xref"
        );
        assert_eq!(scratch_files(&scratch), 0);
    }

    #[tokio::test]
    async fn test_upload_error_cleans_up_partial_input() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path().join("scratch"));
        let service = ConversionService::new(Arc::new(CopyConverter), scratch.clone());

        let upload = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"%PDF")),
            Err(AppError::FileTooLarge(1)),
        ]);
        let err = service.convert("big.pdf", upload).await.unwrap_err();

        assert!(matches!(err, AppError::FileTooLarge(1)));
        assert_eq!(scratch_files(&scratch), 0);
    }

    #[tokio::test]
    async fn test_abandoned_failing_job_still_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path().join("scratch"));
        let service = ConversionService::new(Arc::new(SlowFailingConverter), scratch.clone());

        // il chiamante rinuncia mentre il motore e' ancora in esecuzione
        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            service.convert("slow.pdf", chunks(&[b"%PDF-1.4"])),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(scratch_files(&scratch), 0);
    }

    #[tokio::test]
    async fn test_abandoned_upload_removes_partial_input() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path().join("scratch"));
        let service = ConversionService::new(Arc::new(CopyConverter), scratch.clone());

        // il client smette di inviare dopo il primo chunk
        let stalled = chunks(&[b"%PDF-"]).chain(futures::stream::pending());
        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), service.convert("stalled.pdf", stalled))
                .await;
        assert!(abandoned.is_err());

        assert!(scratch.path().is_dir());
        assert_eq!(scratch_files(&scratch), 0);
    }

    #[tokio::test]
    async fn test_upload_stream_released_before_return() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path().join("scratch"));

        let released = Arc::new(AtomicBool::new(false));
        let ok = ConversionService::new(Arc::new(CopyConverter), scratch.clone());
        ok.convert("a.pdf", flagged_chunks(&[b"%PDF"], &released))
            .await
            .unwrap();
        assert!(released.load(Ordering::SeqCst));

        let released = Arc::new(AtomicBool::new(false));
        let failing = ConversionService::new(Arc::new(FailingConverter), scratch);
        failing
            .convert("b.pdf", flagged_chunks(&[b"%PDF"], &released))
            .await
            .unwrap_err();
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_delete_after_send_retention() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path().join("scratch"));
        let service = ConversionService::new(Arc::new(CopyConverter), scratch.clone())
            .with_retention(OutputRetention::DeleteAfterSend);

        let doc = service.convert("a.pdf", chunks(&[b"x"])).await.unwrap();
        let _file = service.open_output(&doc).await.unwrap();

        #[cfg(unix)]
        assert_eq!(scratch_files(&scratch), 0);
    }

    #[tokio::test]
    async fn test_keep_retention_leaves_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path().join("scratch"));
        let service = ConversionService::new(Arc::new(CopyConverter), scratch.clone());

        let doc = service.convert("a.pdf", chunks(&[b"x"])).await.unwrap();
        let _file = service.open_output(&doc).await.unwrap();

        assert!(doc.input_path.exists());
        assert!(doc.output_path.exists());
    }

    #[tokio::test]
    async fn test_concurrent_jobs_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path().join("scratch"));
        let service = ConversionService::new(Arc::new(CopyConverter), scratch);

        let mut handles = Vec::new();
        for i in 0..16u8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let body = Bytes::from(vec![i; 64]);
                service
                    .convert("same.pdf", futures::stream::iter(vec![Ok(body)]))
                    .await
                    .unwrap()
            }));
        }

        let mut outputs = std::collections::HashSet::new();
        for (i, handle) in handles.into_iter().enumerate() {
            let doc = handle.await.unwrap();
            let data = std::fs::read(&doc.output_path).unwrap();
            assert_eq!(&data[5..], vec![i as u8; 64].as_slice());
            assert!(outputs.insert(doc.output_path));
        }
    }
}
