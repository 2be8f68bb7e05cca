//! Pitch Generator: deterministic template composition by default, or a
//! completion collaborator behind the `PitchModel` capability trait. Model
//! failures never fail the pass; a lead that cannot be pitched is skipped.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::db::{self, Lead};

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

#[derive(Debug, Error)]
pub enum PitchError {
    #[error("rate limited by completion endpoint")]
    RateLimited,
    #[error("completion request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait PitchModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, PitchError>;
}

/// Completion client for a JSON endpoint: POST {"prompt": ...}, expect
/// {"text": ...}. HTTP 429 is surfaced as `RateLimited` so the retry tier
/// can tell it apart from everything else.
pub struct HttpCompletionModel {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpCompletionModel {
    pub fn new(url: String, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(HttpCompletionModel {
            client,
            url,
            api_key,
        })
    }
}

#[async_trait]
impl PitchModel for HttpCompletionModel {
    async fn generate(&self, prompt: &str) -> Result<String, PitchError> {
        let mut req = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "prompt": prompt }));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| PitchError::Request(e.to_string()))?;
        if resp.status().as_u16() == 429 {
            return Err(PitchError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(PitchError::Request(format!("status {}", resp.status())));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PitchError::Request(e.to_string()))?;
        body.get("text")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| PitchError::Request("no text field in response".to_string()))
    }
}

/// Bounded retry, rate-limit failures only: 3 attempts with doubling waits,
/// then give up and return None. Any other failure gives up immediately.
pub async fn generate_with_retry(model: &dyn PitchModel, prompt: &str) -> Option<String> {
    for attempt in 0..MAX_ATTEMPTS {
        match model.generate(prompt).await {
            Ok(text) => return Some(text),
            Err(PitchError::RateLimited) if attempt + 1 < MAX_ATTEMPTS => {
                let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                warn!(
                    "Rate limited (attempt {}/{}), backing off {:.1}s",
                    attempt + 1,
                    MAX_ATTEMPTS,
                    backoff.as_secs_f64()
                );
                sleep(backoff).await;
            }
            Err(e) => {
                warn!("Pitch generation failed: {}", e);
                return None;
            }
        }
    }
    None
}

// ── Template mode ──

const MAINTENANCE_SEGMENTS: &[(&str, &str)] = &[
    (
        "Mármore/Vidro",
        "Notei que seu imóvel possui superfícies nobres como mármore e vidros amplos, \
         que exigem um cuidado especializado para manter o brilho e a sofisticação que \
         seus hóspedes esperam.",
    ),
    (
        "Piscina/Jacuzzi",
        "Como sua propriedade oferece o diferencial de piscina/jacuzzi, sabemos que a \
         manutenção impecável desses itens é o que separa um comentário 5 estrelas de \
         uma reclamação sobre higiene.",
    ),
    (
        "Automação",
        "Vi que você investiu em automação e tecnologia. Esse tipo de setup exige uma \
         equipe que entenda de cuidados técnicos para não comprometer os sistemas \
         durante a operação.",
    ),
    (
        "Café Premium",
        "O capricho com mimos como café premium mostra que você preza pela experiência. \
         Nossa gestão foca em elevar esse padrão em todos os pontos de contato.",
    ),
];

const GENERIC_UPSELL: &str = "Seu imóvel tem um potencial incrível para o mercado de \
     ultra-luxo, e uma gestão operacional de precisão pode ajudar a maximizar seu retorno.";

const CLOSING: &str = "Trabalhamos com consultoria e gestão operacional focada exatamente \
     nesse nível de exigência. Gostaria de agendar uma breve conversa ou uma visita \
     técnica sem compromisso?\n\nNo aguardo!";

/// Deterministic outreach message: greeting, maintenance-specific segments,
/// cleanliness-gap hook (or the generic upsell), fixed call-to-action.
pub fn template_pitch(lead: &Lead) -> String {
    let host = lead
        .host_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("Parceiro");
    let title = lead
        .title
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("seu imóvel");

    let mut pitch = format!("Olá {}! Tudo bem?\n\n", host);
    pitch.push_str(&format!(
        "Estava analisando o perfil do seu imóvel '{}' e fiquei impressionado com o padrão. ",
        title
    ));

    let segments: Vec<&str> = lead
        .maintenance_items
        .iter()
        .filter_map(|item| {
            MAINTENANCE_SEGMENTS
                .iter()
                .find(|(category, _)| category == item)
                .map(|(_, segment)| *segment)
        })
        .collect();
    if !segments.is_empty() {
        pitch.push_str(&segments.join(" "));
        pitch.push(' ');
    }

    let gap_segment = match &lead.cleanliness_gap {
        Some(gap) => format!(
            "Vi alguns comentários sobre a limpeza (mencionaram: {}). Em locações de \
             alto padrão, esses detalhes impactam diretamente seu ranking e preço médio. \
             Podemos resolver isso definitivamente.",
            gap
        ),
        None => GENERIC_UPSELL.to_string(),
    };
    pitch.push_str(&format!("\n\n{}\n\n", gap_segment));
    pitch.push_str(CLOSING);
    pitch
}

/// Prompt for model-delegated mode, carrying the same fields the template
/// uses.
pub fn compose_prompt(lead: &Lead) -> String {
    format!(
        "Escreva uma mensagem curta de prospecção (pt-BR) para o anfitrião '{}' do \
         imóvel '{}'. Itens que exigem manutenção especializada: {}. {} Feche com um \
         convite para uma visita técnica sem compromisso.",
        lead.host_name.as_deref().unwrap_or("Parceiro"),
        lead.title.as_deref().unwrap_or("seu imóvel"),
        if lead.maintenance_items.is_empty() {
            "nenhum".to_string()
        } else {
            lead.maintenance_items.join(", ")
        },
        match &lead.cleanliness_gap {
            Some(gap) => format!("Reclamações recentes de limpeza: {}.", gap),
            None => "Sem reclamações de limpeza conhecidas.".to_string(),
        }
    )
}

pub struct PitchStats {
    pub generated: usize,
    pub skipped: usize,
}

/// Attach a pitch to every ready lead that lacks one. Template mode when no
/// model is given.
pub async fn pitch_pass(conn: &Connection, model: Option<&dyn PitchModel>) -> Result<PitchStats> {
    let leads = db::ready_without_pitch(conn)?;
    info!("{} lead(s) awaiting pitch", leads.len());

    let mut stats = PitchStats {
        generated: 0,
        skipped: 0,
    };
    for lead in leads {
        let pitch = match model {
            Some(m) => generate_with_retry(m, &compose_prompt(&lead)).await,
            None => Some(template_pitch(&lead)),
        };
        match pitch {
            Some(text) => {
                db::save_pitch(conn, lead.id, &text)?;
                stats.generated += 1;
            }
            None => stats.skipped += 1,
        }
    }
    Ok(stats)
}

// ── Tests ──
