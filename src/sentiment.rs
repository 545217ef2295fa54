//! Lexical sentiment scoring of digests.
//!
//! The score is the mean polarity of the lexicon words found in the text,
//! clamped to `[-1, 1]`. A negator (`no`, `nunca`, `not`, ...) within two words
//! before a polar word flips and halves it; an intensifier (`muy`, `very`, ...)
//! scales it. The lexicon covers Spanish and English economy vocabulary, since
//! digests come back in the prompt's language.

use crate::models::Sentiment;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Scores strictly above this are positive.
pub const POSITIVE_THRESHOLD: f64 = 0.1;
/// Scores strictly below this are negative.
pub const NEGATIVE_THRESHOLD: f64 = -0.1;

const NEGATION_FACTOR: f64 = -0.5;
/// Words a modifier may skip before it stops applying.
const MODIFIER_REACH: usize = 2;

static LEXICON: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        // es: positive
        ("crece", 0.5),
        ("crecen", 0.5),
        ("creció", 0.5),
        ("crecimiento", 0.5),
        ("mejora", 0.5),
        ("mejoras", 0.5),
        ("mejoró", 0.5),
        ("recupera", 0.4),
        ("recuperación", 0.4),
        ("repunte", 0.4),
        ("repunta", 0.4),
        ("alza", 0.3),
        ("récord", 0.4),
        ("ganancia", 0.5),
        ("ganancias", 0.5),
        ("superávit", 0.6),
        ("estabilidad", 0.4),
        ("estable", 0.3),
        ("acuerdo", 0.3),
        ("inversión", 0.3),
        ("inversiones", 0.3),
        ("positivo", 0.6),
        ("positiva", 0.6),
        ("optimismo", 0.6),
        ("éxito", 0.8),
        ("beneficio", 0.5),
        ("beneficios", 0.5),
        ("bueno", 0.7),
        ("buena", 0.7),
        ("buen", 0.7),
        ("excelente", 1.0),
        ("favorable", 0.5),
        ("alivio", 0.4),
        ("confianza", 0.4),
        ("expansión", 0.3),
        // es: negative
        ("crisis", -0.7),
        ("caída", -0.5),
        ("cae", -0.5),
        ("caen", -0.5),
        ("cayó", -0.5),
        ("inflación", -0.3),
        ("déficit", -0.5),
        ("deuda", -0.2),
        ("recesión", -0.7),
        ("pérdida", -0.5),
        ("pérdidas", -0.5),
        ("pierde", -0.4),
        ("default", -0.7),
        ("devaluación", -0.5),
        ("desempleo", -0.6),
        ("pobreza", -0.6),
        ("riesgo", -0.3),
        ("incertidumbre", -0.4),
        ("temor", -0.5),
        ("malo", -0.7),
        ("mala", -0.7),
        ("mal", -0.6),
        ("negativo", -0.6),
        ("negativa", -0.6),
        ("preocupación", -0.5),
        ("conflicto", -0.5),
        ("huelga", -0.4),
        ("paro", -0.4),
        ("tensión", -0.4),
        ("desplome", -0.8),
        ("derrumbe", -0.8),
        ("quiebra", -0.8),
        ("ajuste", -0.2),
        ("corrida", -0.5),
        ("escasez", -0.5),
        ("fracaso", -0.8),
        // en: positive
        ("growth", 0.5),
        ("grows", 0.5),
        ("gain", 0.5),
        ("gains", 0.5),
        ("rise", 0.3),
        ("rises", 0.3),
        ("record", 0.4),
        ("improve", 0.5),
        ("improves", 0.5),
        ("recovery", 0.4),
        ("surplus", 0.6),
        ("strong", 0.43),
        ("good", 0.7),
        ("great", 0.8),
        ("excellent", 1.0),
        ("positive", 0.23),
        ("eases", 0.3),
        ("stable", 0.3),
        ("boost", 0.4),
        ("optimism", 0.5),
        // en: negative
        ("fall", -0.4),
        ("falls", -0.4),
        ("drop", -0.4),
        ("drops", -0.4),
        ("decline", -0.4),
        ("loss", -0.5),
        ("losses", -0.5),
        ("recession", -0.7),
        ("inflation", -0.3),
        ("deficit", -0.5),
        ("bad", -0.7),
        ("poor", -0.4),
        ("weak", -0.4),
        ("risk", -0.3),
        ("fear", -0.5),
        ("fears", -0.5),
        ("crash", -0.8),
        ("collapse", -0.8),
        ("unemployment", -0.6),
        ("negative", -0.3),
        ("worst", -1.0),
        ("uncertainty", -0.4),
    ]
    .into_iter()
    .collect()
});

const NEGATORS: &[&str] = &[
    "no", "nunca", "jamás", "sin", "ni", "tampoco", "not", "never", "without", "nor",
];

static INTENSIFIERS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        ("muy", 1.3),
        ("mucho", 1.3),
        ("mucha", 1.3),
        ("sumamente", 1.5),
        ("altamente", 1.3),
        ("levemente", 0.5),
        ("very", 1.3),
        ("really", 1.3),
        ("highly", 1.3),
        ("extremely", 1.5),
        ("slightly", 0.5),
    ]
    .into_iter()
    .collect()
});

/// Polarity of `text` in `[-1, 1]`; `0.0` when no lexicon word occurs.
pub fn polarity(text: &str) -> f64 {
    let lowered = text.to_lowercase();
    let mut scores = Vec::new();
    let mut negated = false;
    let mut intensity = 1.0;
    let mut gap = 0usize;

    for token in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        if NEGATORS.contains(&token) {
            negated = !negated;
            gap = 0;
            continue;
        }
        if let Some(factor) = INTENSIFIERS.get(token) {
            intensity *= factor;
            gap = 0;
            continue;
        }
        if let Some(&value) = LEXICON.get(token) {
            let mut score = value * intensity;
            if negated {
                score *= NEGATION_FACTOR;
            }
            scores.push(score);
            negated = false;
            intensity = 1.0;
            gap = 0;
            continue;
        }
        gap += 1;
        if gap > MODIFIER_REACH {
            negated = false;
            intensity = 1.0;
        }
    }

    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    mean.clamp(-1.0, 1.0)
}

impl Sentiment {
    /// Bucket a polarity score. Both thresholds are exclusive.
    pub fn from_polarity(score: f64) -> Self {
        if score > POSITIVE_THRESHOLD {
            Sentiment::Positive
        } else if score < NEGATIVE_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

/// Classify a digest.
pub fn classify(digest: &str) -> Sentiment {
    Sentiment::from_polarity(polarity(digest))
}
