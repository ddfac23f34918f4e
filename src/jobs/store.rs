//! # Almacén Durable de Resultados
//! src/jobs/store.rs
//!
//! Un archivo JSON por job terminado, bajo el directorio de resultados.
//! La publicación es atómica: el worker escribe a un archivo temporal con
//! nombre único y recién al renombrarlo sobre el nombre final el resultado
//! se vuelve visible. Un lector jamás puede observar un archivo a medio
//! escribir; el rename es la única transición de visibilidad.
//!
//! El nombre del archivo deriva solo del id (`job_id_{N}`), así que el
//! estado de un job se deduce de la existencia y el contenido del archivo
//! sin ningún índice adicional en memoria.

use crate::jobs::types::JobOutcome;
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Errores al leer un registro publicado
#[derive(Debug)]
pub enum StoreError {
    /// El directorio o el archivo no se pudieron acceder
    Io(String),

    /// El archivo existe pero no decodifica como registro válido
    Corrupt(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(detail) => write!(f, "Result store IO error: {}", detail),
            StoreError::Corrupt(detail) => write!(f, "Failed to decode result data: {}", detail),
        }
    }
}

impl std::error::Error for StoreError {}

/// Store de resultados respaldado por el filesystem
pub struct ResultStore {
    /// Directorio donde viven los archivos `job_id_{N}`
    dir: PathBuf,
}

impl ResultStore {
    /// Crea el store, asegurando que el directorio exista
    pub fn new<P: Into<PathBuf>>(dir: P) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directorio de resultados
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ruta final del registro de un job
    fn result_path(&self, job_id: u64) -> PathBuf {
        self.dir.join(format!("job_id_{}", job_id))
    }

    /// Sufijo único para el archivo temporal de este escritor
    ///
    /// Hash de thread + timestamp: dos publicaciones simultáneas del mismo
    /// id nunca comparten archivo temporal.
    fn writer_tag() -> String {
        let mut hasher = DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    /// Publica el registro de un job de forma atómica
    ///
    /// Escribe el JSON completo a un temporal, hace flush y lo renombra
    /// sobre el nombre final. Si algo falla antes del rename solo queda
    /// basura temporal, nunca un registro parcial. Un segundo publish del
    /// mismo id reemplaza al registro completo, también atómicamente.
    pub fn publish(&self, job_id: u64, outcome: &JobOutcome) -> std::io::Result<()> {
        let temp_path = self
            .dir
            .join(format!("job_id_{}.tmp.{}", job_id, Self::writer_tag()));

        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer(&mut writer, outcome)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        writer.flush()?;

        // Renombrar (atómico en sistemas Unix): única transición de visibilidad
        fs::rename(&temp_path, self.result_path(job_id))?;

        Ok(())
    }

    /// Lee el registro publicado de un job
    ///
    /// `Ok(None)` si el archivo no existe todavía (el job sigue en vuelo o
    /// el id nunca se emitió: eso lo decide el oráculo, no el store).
    pub fn read(&self, job_id: u64) -> Result<Option<JobOutcome>, StoreError> {
        let file = match File::open(self.result_path(job_id)) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        let reader = BufReader::new(file);
        match serde_json::from_reader(reader) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) => Err(StoreError::Corrupt(e.to_string())),
        }
    }
}

impl Clone for ResultStore {
    fn clone(&self) -> Self {
        Self {
            dir: self.dir.clone(),
        }
    }
}
