//! Issue explanations tailored to the learner
//!
//! Explanations come from the built-in [`templates`] table unless an AI
//! backend is configured and the caller asks for it. AI answers are cached
//! per (code, level) for the lifetime of the engine.

pub mod templates;

use crate::ai::{explanation_prompt, parse_sections, AiClient, AiExplanation, Message, SYSTEM_PROMPT};
use crate::models::{ExperienceLevel, Issue};
use crate::profile::{ProfileError, ProfileStore};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub use templates::{FormattedTemplate, Template};

const OOP_ADVICE: &str = "\n\nSince you know OOP: Consider refactoring into smaller methods.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationSource {
    Template,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub title: String,
    pub why: String,
    pub fix: String,
    pub example: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_tip: Option<String>,
    pub level: ExperienceLevel,
    pub source: ExplanationSource,
}

pub struct ExplanationEngine {
    profiles: Arc<ProfileStore>,
    ai: Option<Arc<AiClient>>,
    cache: DashMap<(String, ExperienceLevel), AiExplanation>,
}

impl ExplanationEngine {
    pub fn new(profiles: Arc<ProfileStore>, ai: Option<Arc<AiClient>>) -> Self {
        Self {
            profiles,
            ai,
            cache: DashMap::new(),
        }
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    /// Explain `issue` for `user_id` and record the sighting in their profile.
    ///
    /// With `use_ai`, a configured backend is asked first; an empty or failed
    /// answer falls back to the template. Blocks on the network in that case.
    pub fn explain(
        &self,
        issue: &Issue,
        user_id: &str,
        use_ai: bool,
    ) -> Result<Explanation, ProfileError> {
        let profile = self
            .profiles
            .update(user_id, |p| p.record_issue(&issue.code))?;
        let level = profile.experience_level;

        let template = templates::lookup(&issue.code, level).format(issue);
        let ai = if use_ai { self.ai_explanation(issue, level) } else { None };

        let mut explanation = match ai {
            Some(answer) => Explanation {
                title: template.title,
                why: answer.why,
                fix: answer.fix,
                example: answer.example,
                advanced_tip: Some(answer.advanced_tip).filter(|t| !t.is_empty()),
                level,
                source: ExplanationSource::Ai,
            },
            None => Explanation {
                title: template.title,
                why: template.why,
                fix: template.fix,
                example: template.example,
                advanced_tip: None,
                level,
                source: ExplanationSource::Template,
            },
        };

        if profile.known_concepts.contains("OOP") {
            explanation.fix.push_str(OOP_ADVICE);
        }
        Ok(explanation)
    }

    /// Raw template lookup
    pub fn template(&self, code: &str, level: ExperienceLevel) -> Template {
        templates::lookup(code, level)
    }

    fn ai_explanation(&self, issue: &Issue, level: ExperienceLevel) -> Option<AiExplanation> {
        let client = self.ai.as_ref()?;
        let key = (issue.code.clone(), level);
        if let Some(cached) = self.cache.get(&key) {
            debug!("AI explanation cache hit for {} ({})", issue.code, level);
            return Some(cached.clone());
        }

        let prompt = explanation_prompt(issue, level);
        let answer = match client.generate(vec![Message::user(prompt)], Some(SYSTEM_PROMPT)) {
            Ok(answer) => answer,
            Err(e) => {
                warn!("AI explanation for {} failed, using template: {}", issue.code, e);
                return None;
            }
        };

        let parsed = parse_sections(&answer);
        if parsed.is_empty() {
            warn!("AI explanation for {} had no sections, using template", issue.code);
            return None;
        }
        self.cache.insert(key, parsed.clone());
        Some(parsed)
    }
}
