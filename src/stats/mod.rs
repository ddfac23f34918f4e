//! # Cálculos Estadísticos
//! src/stats/mod.rs
//!
//! Las nueve agregaciones que el servidor ejecuta como jobs asíncronos.
//! Todas son funciones puras con la misma firma: reciben el dataset y los
//! parámetros del job, retornan un `serde_json::Value` listo para publicar.
//!
//! - `states_mean`: media por estado, ordenada ascendente por valor
//! - `state_mean`: media de un estado
//! - `best5` / `worst5`: los 5 mejores/peores estados según la pregunta
//! - `global_mean`: media global de la pregunta
//! - `diff_from_mean`: media global − media del estado, para todos
//! - `state_diff_from_mean`: la misma diferencia para un estado
//! - `mean_by_category`: media por (estado, categoría, valor de estratificación)
//! - `state_mean_by_category`: medias por categoría de un estado
//!
//! El orden de inserción de los mapas JSON es significativo para los
//! resultados ordenados (serde_json con `preserve_order`).

use crate::data::{CategoryBreakdown, Dataset};
use crate::jobs::types::JobParams;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;

/// Media de todas las mediciones de un breakdown, si hay alguna
fn mean_of(breakdown: &CategoryBreakdown) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for values_by_strat in breakdown.values() {
        for values in values_by_strat.values() {
            sum += values.iter().sum::<f64>();
            count += values.len();
        }
    }
    if count > 0 {
        Some(sum / count as f64)
    } else {
        None
    }
}

/// Media por estado para una pregunta, en orden de iteración del dataset
fn state_means_for(dataset: &Dataset, question: &str) -> Vec<(String, f64)> {
    dataset
        .for_question(question)
        .filter_map(|(state, breakdown)| {
            mean_of(breakdown).map(|mean| (state.to_string(), mean))
        })
        .collect()
}

/// Construye un objeto JSON respetando el orden de los pares
fn ordered_object(pairs: Vec<(String, f64)>) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs {
        map.insert(key, json!(value));
    }
    Value::Object(map)
}

/// Extrae el parámetro `state`, requerido por los cálculos por-estado
fn require_state(params: &JobParams) -> Result<&str, String> {
    params
        .state
        .as_deref()
        .ok_or_else(|| "Missing required field: state".to_string())
}

/// Ordena pares (estado, media) por valor, ascendente o descendente
fn sort_by_value(pairs: &mut [(String, f64)], descending: bool) {
    pairs.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
        if descending { ord.reverse() } else { ord }
    });
}

/// Media por estado para una pregunta, todos los estados
///
/// # Ejemplo de resultado
/// ```json
/// {"Utah": 20.0, "Ohio": 30.0}
/// ```
/// Ordenado ascendente por valor.
pub fn states_mean(dataset: &Dataset, params: &JobParams) -> Result<Value, String> {
    let mut pairs = state_means_for(dataset, &params.question);
    sort_by_value(&mut pairs, false);
    Ok(ordered_object(pairs))
}

/// Media de un estado para una pregunta
///
/// # Ejemplo de resultado
/// ```json
/// {"Ohio": 30.0}
/// ```
/// Objeto vacío si el estado no tiene datos para la pregunta.
pub fn state_mean(dataset: &Dataset, params: &JobParams) -> Result<Value, String> {
    let state = require_state(params)?;

    let mut map = Map::new();
    if let Some(breakdown) = dataset.state_breakdown(state, &params.question) {
        if let Some(mean) = mean_of(breakdown) {
            map.insert(state.to_string(), json!(mean));
        }
    }
    Ok(Value::Object(map))
}

/// Los 5 mejores estados para una pregunta
///
/// "Mejor" depende de la pregunta: descendente si está en la lista de
/// "más alto es mejor", ascendente en caso contrario.
pub fn best5(dataset: &Dataset, params: &JobParams) -> Result<Value, String> {
    let mut pairs = state_means_for(dataset, &params.question);
    sort_by_value(&mut pairs, dataset.question_best_is_max(&params.question));
    pairs.truncate(5);
    Ok(ordered_object(pairs))
}

/// Los 5 peores estados para una pregunta
///
/// Para preguntas de "más bajo es mejor" los peores son los valores más
/// altos (descendente); ascendente en caso contrario.
pub fn worst5(dataset: &Dataset, params: &JobParams) -> Result<Value, String> {
    let mut pairs = state_means_for(dataset, &params.question);
    sort_by_value(&mut pairs, dataset.question_best_is_min(&params.question));
    pairs.truncate(5);
    Ok(ordered_object(pairs))
}

/// Media global de una pregunta sobre todos los estados
///
/// # Ejemplo de resultado
/// ```json
/// {"global_mean": 25.3}
/// ```
/// `null` si la pregunta no tiene mediciones.
pub fn global_mean(dataset: &Dataset, params: &JobParams) -> Result<Value, String> {
    Ok(json!({ "global_mean": global_mean_value(dataset, &params.question) }))
}

fn global_mean_value(dataset: &Dataset, question: &str) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (_, breakdown) in dataset.for_question(question) {
        for values_by_strat in breakdown.values() {
            for values in values_by_strat.values() {
                sum += values.iter().sum::<f64>();
                count += values.len();
            }
        }
    }
    if count > 0 {
        Some(sum / count as f64)
    } else {
        None
    }
}

/// Diferencia entre la media global y la media de cada estado
pub fn diff_from_mean(dataset: &Dataset, params: &JobParams) -> Result<Value, String> {
    let mut map = Map::new();
    if let Some(global) = global_mean_value(dataset, &params.question) {
        for (state, mean) in state_means_for(dataset, &params.question) {
            map.insert(state, json!(global - mean));
        }
    }
    Ok(Value::Object(map))
}

/// Diferencia entre la media global y la media de un estado
///
/// # Ejemplo de resultado
/// ```json
/// {"Ohio": -4.7}
/// ```
/// `null` como valor si el estado o la pregunta no tienen mediciones.
pub fn state_diff_from_mean(dataset: &Dataset, params: &JobParams) -> Result<Value, String> {
    let state = require_state(params)?;

    let global = global_mean_value(dataset, &params.question);
    let state_mean = dataset
        .state_breakdown(state, &params.question)
        .and_then(mean_of);

    let value = match (global, state_mean) {
        (Some(g), Some(m)) => json!(g - m),
        _ => Value::Null,
    };
    Ok(json!({ state: value }))
}

/// ¿El componente de estratificación está vacío o es un NaN textual?
fn empty_stratification(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("nan")
}

/// Media por (estado, categoría, valor de estratificación)
///
/// # Ejemplo de resultado
/// ```json
/// {"('Ohio', 'Age (years)', '25 - 34')": 30.5}
/// ```
/// Los grupos con categoría o valor vacíos se omiten.
pub fn mean_by_category(dataset: &Dataset, params: &JobParams) -> Result<Value, String> {
    let mut map = Map::new();
    for (state, breakdown) in dataset.for_question(&params.question) {
        for (category, values_by_strat) in breakdown {
            if empty_stratification(category) {
                continue;
            }
            for (strat_value, values) in values_by_strat {
                if empty_stratification(strat_value) {
                    continue;
                }
                if values.is_empty() {
                    continue;
                }
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                let key = format!("('{}', '{}', '{}')", state, category, strat_value);
                map.insert(key, json!(mean));
            }
        }
    }
    Ok(Value::Object(map))
}

/// Medias por categoría de un estado, anidadas bajo el estado
///
/// # Ejemplo de resultado
/// ```json
/// {"Ohio": {"('Age (years)', '25 - 34')": 30.5}}
/// ```
pub fn state_mean_by_category(dataset: &Dataset, params: &JobParams) -> Result<Value, String> {
    let state = require_state(params)?;

    let mut inner = Map::new();
    if let Some(breakdown) = dataset.state_breakdown(state, &params.question) {
        for (category, values_by_strat) in breakdown {
            for (strat_value, values) in values_by_strat {
                if values.is_empty() {
                    continue;
                }
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                let key = format!("('{}', '{}')", category, strat_value);
                inner.insert(key, json!(mean));
            }
        }
    }
    Ok(json!({ state: Value::Object(inner) }))
}
