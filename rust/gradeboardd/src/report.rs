use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calc::{format_average, subject_average};
use crate::config::AiConfig;
use crate::model::SubPeriod;

pub const UNAVAILABLE_PLACEHOLDER: &str =
    "<p>L'analyse n'est pas disponible pour le moment.</p>";
pub const FAILURE_PLACEHOLDER: &str = "<p class='text-rose-600 font-bold'>Erreur lors de la génération de l'analyse IA. Vérifiez votre connexion.</p>";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no API key configured")]
    NotConfigured,

    #[error("report request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("report service returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Plain-text digest of a year, one block per sub-period.
pub fn build_data_summary(sub_periods: &[SubPeriod]) -> String {
    let blocks: Vec<String> = sub_periods
        .iter()
        .map(|sp| {
            let mut block = format!("Période: {}\n", sp.name);
            if sp.subjects.is_empty() {
                block.push_str("    Aucune matière");
                return block;
            }
            let lines: Vec<String> = sp
                .subjects
                .iter()
                .map(|s| {
                    let avg = match subject_average(&s.grades) {
                        Some(v) => format_average(Some(v)),
                        None => "N/A".to_string(),
                    };
                    format!("    - {}: {}/20 (Coef {})", s.name, avg, s.coefficient)
                })
                .collect();
            block.push_str(&lines.join("\n"));
            block
        })
        .collect();
    blocks.join("\n\n")
}

pub fn build_prompt(sub_periods: &[SubPeriod], year_name: &str) -> String {
    let data_summary = build_data_summary(sub_periods);
    format!(
        r#"
    Tu es un expert en coaching scolaire. Analyse les résultats de l'élève pour l'année "{year_name}".
    Voici les données par sous-périodes :
    {data_summary}

    Génère un rapport pédagogique interactif en HTML (sans balises <html>/<body>).
    
    RÈGLES DE DESIGN CRITIQUES :
    - UTILISE DES COULEURS À HAUT CONTRASTE. 
    - Fond des blocs : 'bg-white' ou 'bg-slate-50'.
    - Texte : 'text-slate-900' ou 'text-slate-800'. JAMAIS de texte sombre sur fond sombre.
    - Utilise des bordures colorées 'border-l-4' pour distinguer les sections.

    STRUCTURE DU RAPPORT :
    1. 📊 **Vue d'ensemble** : Analyse de la dynamique entre les périodes (progression ou baisse).
    2. 🎯 **Focus Matières** : Quelles matières tirent la moyenne vers le haut/bas.
    3. 🚀 **Plan d'Action Stratégique** : Calcule précisément quel score l'élève doit viser dans sa matière à plus fort coefficient pour augmenter sa moyenne générale de 1 point.
    4. 💡 **Conseils de Méthodologie** : 3 astuces personnalisées.
    5. 🌟 **Mot de l'expert** : Une conclusion encourageante.

    Utilise Tailwind CSS pour le style. Sois précis et technique mais encourageant.
  "#
    )
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let text: String = self
            .candidates
            .first()?
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Single best-effort call to the text-generation service. No retry.
pub struct ReportClient {
    client: Client,
    config: AiConfig,
}

impl ReportClient {
    pub fn new(config: AiConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Returns `Ok(None)` when the service answered without any text.
    pub fn try_generate(&self, prompt: &str) -> Result<Option<String>, ReportError> {
        let Some(key) = self.config.api_key.as_deref() else {
            return Err(ReportError::NotConfigured);
        };
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let payload = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&payload)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "failed to decode error response".to_string());
            return Err(ReportError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json()?;
        Ok(parsed.text())
    }

    /// Never fails: every problem turns into a placeholder the front-end can
    /// display as-is.
    pub fn generate(&self, sub_periods: &[SubPeriod], year_name: &str) -> String {
        let prompt = build_prompt(sub_periods, year_name);
        match self.try_generate(&prompt) {
            Ok(Some(text)) => text,
            Ok(None) => UNAVAILABLE_PLACEHOLDER.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, model = %self.config.model, "AI report generation failed");
                FAILURE_PLACEHOLDER.to_string()
            }
        }
    }
}
