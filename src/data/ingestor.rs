//! # Ingesta del Dataset
//! src/data/ingestor.rs
//!
//! Parsea el CSV de la encuesta y lo convierte en el lookup anidado que
//! consumen los cálculos estadísticos. Solo interesan cinco columnas,
//! ubicadas por nombre en el header:
//!
//! - `LocationDesc`: estado
//! - `Question`: pregunta de la encuesta
//! - `Data_Value`: valor medido (porcentaje)
//! - `StratificationCategory1`: categoría de estratificación
//! - `Stratification1`: valor de estratificación
//!
//! Las filas con `Data_Value` vacío o no numérico se descartan. El parser
//! de líneas respeta campos entre comillas dobles (las preguntas contienen
//! comas) y comillas escapadas (`""`).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};

/// categoría de estratificación → valor de estratificación → mediciones
pub type CategoryBreakdown = BTreeMap<String, BTreeMap<String, Vec<f64>>>;

/// pregunta → breakdown por categoría
type QuestionMap = BTreeMap<String, CategoryBreakdown>;

/// Preguntas donde un valor más bajo es mejor
const QUESTIONS_BEST_IS_MIN: [&str; 5] = [
    "Percent of adults aged 18 years and older who have an overweight classification",
    "Percent of adults aged 18 years and older who have obesity",
    "Percent of adults who engage in no leisure-time physical activity",
    "Percent of adults who report consuming fruit less than one time daily",
    "Percent of adults who report consuming vegetables less than one time daily",
];

/// Preguntas donde un valor más alto es mejor
const QUESTIONS_BEST_IS_MAX: [&str; 4] = [
    "Percent of adults who achieve at least 150 minutes a week of moderate-intensity aerobic physical activity or 75 minutes a week of vigorous-intensity aerobic activity (or an equivalent combination)",
    "Percent of adults who achieve at least 150 minutes a week of moderate-intensity aerobic physical activity or 75 minutes a week of vigorous-intensity aerobic physical activity and engage in muscle-strengthening activities on 2 or more days a week",
    "Percent of adults who achieve at least 300 minutes a week of moderate-intensity aerobic physical activity or 150 minutes a week of vigorous-intensity aerobic activity (or an equivalent combination)",
    "Percent of adults who engage in muscle-strengthening activities on 2 or more days a week",
];

/// Errores que pueden ocurrir durante la ingesta
#[derive(Debug)]
pub enum IngestError {
    /// Error de I/O leyendo el archivo
    Io(String),

    /// El archivo no tiene header
    MissingHeader,

    /// Falta una columna requerida en el header
    MissingColumn(String),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Io(e) => write!(f, "IO error reading dataset: {}", e),
            IngestError::MissingHeader => write!(f, "Dataset file has no header row"),
            IngestError::MissingColumn(c) => write!(f, "Missing required column: {}", c),
        }
    }
}

impl std::error::Error for IngestError {}

/// Lookup anidado construido a partir del CSV
///
/// Los mapas son `BTreeMap` para que la iteración sea determinista: los
/// cálculos que no ordenan explícitamente heredan un orden estable por clave.
#[derive(Debug, Default)]
pub struct Dataset {
    /// estado → pregunta → categoría → valor → mediciones
    data: BTreeMap<String, QuestionMap>,

    /// Filas válidas ingeridas (para el banner de arranque)
    rows: usize,
}

impl Dataset {
    /// Crea un dataset vacío
    pub fn new() -> Self {
        Self::default()
    }

    /// Carga el dataset desde un archivo CSV
    pub fn from_csv_path(path: &str) -> Result<Self, IngestError> {
        let file = File::open(path)
            .map_err(|e| IngestError::Io(format!("{}: {}", path, e)))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Carga el dataset desde cualquier reader (seam para tests)
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, IngestError> {
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line.map_err(|e| IngestError::Io(e.to_string()))?,
            None => return Err(IngestError::MissingHeader),
        };
        let columns = Columns::locate(&split_csv_line(&header))?;

        let mut dataset = Dataset::new();
        for line in lines {
            let line = line.map_err(|e| IngestError::Io(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }

            let fields = split_csv_line(&line);
            let Some(row) = columns.extract(&fields) else {
                continue; // fila más corta que las columnas requeridas
            };

            // Data_Value vacío o no numérico: la fila no aporta medición
            let value: f64 = match row.value.parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            if value.is_nan() {
                continue;
            }

            dataset.add_entry(row.state, row.question, row.category, row.strat_value, value);
        }

        Ok(dataset)
    }

    /// Inserta una medición individual
    ///
    /// Disponible también para construir datasets programáticamente en tests.
    pub fn add_entry(&mut self, state: &str, question: &str, category: &str, strat_value: &str, value: f64) {
        self.data
            .entry(state.to_string())
            .or_default()
            .entry(question.to_string())
            .or_default()
            .entry(category.to_string())
            .or_default()
            .entry(strat_value.to_string())
            .or_default()
            .push(value);
        self.rows += 1;
    }

    /// Itera los estados que tienen datos para una pregunta
    pub fn for_question<'a>(
        &'a self,
        question: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a CategoryBreakdown)> + 'a {
        self.data.iter().filter_map(move |(state, questions)| {
            questions.get(question).map(|b| (state.as_str(), b))
        })
    }

    /// Breakdown por categoría para un (estado, pregunta), si existe
    pub fn state_breakdown(&self, state: &str, question: &str) -> Option<&CategoryBreakdown> {
        self.data.get(state).and_then(|questions| questions.get(question))
    }

    /// ¿La pregunta es de las que "más alto es mejor"?
    pub fn question_best_is_max(&self, question: &str) -> bool {
        QUESTIONS_BEST_IS_MAX.contains(&question)
    }

    /// ¿La pregunta es de las que "más bajo es mejor"?
    pub fn question_best_is_min(&self, question: &str) -> bool {
        QUESTIONS_BEST_IS_MIN.contains(&question)
    }

    /// Cantidad de estados con al menos una medición
    pub fn state_count(&self) -> usize {
        self.data.len()
    }

    /// Cantidad de filas válidas ingeridas
    pub fn row_count(&self) -> usize {
        self.rows
    }
}

/// Índices de las cinco columnas requeridas dentro del header
struct Columns {
    state: usize,
    question: usize,
    value: usize,
    category: usize,
    strat_value: usize,
}

/// Una fila ya proyectada a las columnas de interés
struct RawRow<'a> {
    state: &'a str,
    question: &'a str,
    value: &'a str,
    category: &'a str,
    strat_value: &'a str,
}

impl Columns {
    fn locate(header: &[String]) -> Result<Self, IngestError> {
        let find = |name: &str| -> Result<usize, IngestError> {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            state: find("LocationDesc")?,
            question: find("Question")?,
            value: find("Data_Value")?,
            category: find("StratificationCategory1")?,
            strat_value: find("Stratification1")?,
        })
    }

    fn extract<'a>(&self, fields: &'a [String]) -> Option<RawRow<'a>> {
        let get = |idx: usize| fields.get(idx).map(|s| s.as_str());
        Some(RawRow {
            state: get(self.state)?,
            question: get(self.question)?,
            value: get(self.value)?,
            category: get(self.category)?,
            strat_value: get(self.strat_value)?,
        })
    }
}

/// Separa una línea CSV en campos
///
/// Respeta campos entre comillas dobles (pueden contener comas) y comillas
/// escapadas como `""` dentro de un campo quoted.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    // Comilla escapada dentro de un campo quoted
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields
}
