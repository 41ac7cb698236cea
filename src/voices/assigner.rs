/*!
 * Voice assignment engine.
 *
 * The narrator is decided once per script and returned as a
 * `NarratorDecision` value, which the caller threads through the rest of
 * the run. Dialogue voices come from a per-backend gender pool, indexed by
 * a hash of the character name so a character keeps its voice everywhere.
 */

use log::{debug, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::language_utils::{LanguagePolicy, VoiceLanguage, detect_script_language};
use crate::script::{Gender, NARRATOR, Script, Segment};

use super::catalog::VoiceCatalog;
use super::{BackendKind, UserTier, VoiceIdentity};

/// Narrator choice for one script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarratorDecision {
    // @field: Language detected once for the whole script
    pub language: VoiceLanguage,

    // @field: Voice shared by every narration segment
    pub narrator: VoiceIdentity,

    // @field: Backend dialogue pools are drawn from
    pub dialogue_backend: BackendKind,

    // @field: Whether the narrator came from a manual voice choice
    pub overridden: bool,
}

/// One line of the cast sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastMember {
    pub character: String,
    pub gender: Gender,
    pub voice: VoiceIdentity,
    pub voice_label: String,
}

/// Resolves a voice for every segment of a script
#[derive(Debug, Clone)]
pub struct VoiceAssigner {
    tier: UserTier,
    default_language: VoiceLanguage,
    policy: LanguagePolicy,
    // @field: Backends a run can reach; `None` assumes all of them
    available: Option<Vec<BackendKind>>,
}

impl Default for VoiceAssigner {
    fn default() -> Self {
        Self::new(UserTier::Free)
    }
}

impl VoiceAssigner {
    pub fn new(tier: UserTier) -> Self {
        Self {
            tier,
            default_language: VoiceLanguage::English,
            policy: LanguagePolicy::default(),
            available: None,
        }
    }

    pub fn with_default_language(mut self, language: VoiceLanguage) -> Self {
        self.default_language = language;
        self
    }

    pub fn with_language_policy(mut self, policy: LanguagePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Restrict narration to backends that are actually configured
    pub fn with_available_backends(mut self, backends: impl IntoIterator<Item = BackendKind>) -> Self {
        self.available = Some(backends.into_iter().collect());
        self
    }

    pub fn tier(&self) -> UserTier {
        self.tier
    }

    /// Narration backend for this tier, falling back down the tier's
    /// preference list when the primary one is not available
    pub fn narration_backend(&self) -> BackendKind {
        let primary = self.tier.narration_backend();
        let Some(available) = &self.available else {
            return primary;
        };

        match self.tier.narration_candidates().into_iter().find(|kind| available.contains(kind)) {
            Some(kind) if kind != primary => {
                warn!("{} is not available for narration, falling back to {}", primary, kind);
                kind
            }
            Some(kind) => kind,
            // Nothing reachable; synthesis reports the missing backend
            None => primary,
        }
    }

    /// Decide the narrator for the whole script.
    ///
    /// Segment gender never takes part in this decision.
    pub fn decide_narrator(&self, script: &Script) -> NarratorDecision {
        let language = detect_script_language(
            script.iter().map(|s| s.text.as_str()),
            self.default_language,
            self.policy,
        );

        let manual = script
            .iter()
            .find(|s| s.is_narration())
            .and_then(|s| s.voice_override.as_deref())
            .and_then(|raw| {
                let parsed = VoiceCatalog::parse_override(raw);
                if parsed.is_none() {
                    warn!("Ignoring unresolvable narrator voice '{}'", raw);
                }
                parsed
            });

        let (narrator, overridden) = match manual {
            Some((backend, voice_id)) => (VoiceIdentity::new(backend, voice_id, language), true),
            None => {
                let backend = self.narration_backend();
                let voice_id = VoiceCatalog::narrator_voice(backend, language);
                (VoiceIdentity::new(backend, voice_id, language), false)
            }
        };

        debug!(
            "Narrator decided: {} (tier {}, language {}, manual {})",
            narrator, self.tier, language, overridden
        );

        NarratorDecision {
            language,
            narrator,
            dialogue_backend: self.tier.dialogue_backend(),
            overridden,
        }
    }

    /// Voice for one dialogue segment
    pub fn dialogue_voice(&self, decision: &NarratorDecision, segment: &Segment) -> VoiceIdentity {
        if let Some(raw) = segment.voice_override.as_deref() {
            match VoiceCatalog::parse_override(raw) {
                Some((backend, voice_id)) => return VoiceIdentity::new(backend, voice_id, decision.language),
                None => warn!("Ignoring unresolvable voice '{}' for {}", raw, segment.character),
            }
        }

        let backend = decision.dialogue_backend;
        let table = VoiceCatalog::table(backend, decision.language);
        let voice_id = match table.pool(segment.gender) {
            Some(pool) if !pool.is_empty() => pool[pool_index(&segment.character, pool.len())],
            _ => table.default_voice(),
        };

        VoiceIdentity::new(backend, voice_id, decision.language)
    }

    /// Resolve a voice for every segment.
    ///
    /// Only `resolved_voice` is written; the returned decision is the narrator
    /// value for this run.
    pub fn assign(&self, script: &mut Script) -> NarratorDecision {
        let decision = self.decide_narrator(script);

        let voices: Vec<VoiceIdentity> = script
            .iter()
            .map(|segment| {
                if segment.is_narration() {
                    decision.narrator.clone()
                } else {
                    self.dialogue_voice(&decision, segment)
                }
            })
            .collect();

        for (index, voice) in voices.into_iter().enumerate() {
            debug!("Segment {} -> {}", index, voice);
            script.set_resolved_voice(index, voice);
        }

        decision
    }

    /// Cast list of an assigned script: Narrator first, then characters by first appearance
    pub fn cast_sheet(script: &Script) -> Vec<CastMember> {
        let mut cast: Vec<CastMember> = Vec::new();

        if let Some(voice) = script
            .iter()
            .find(|s| s.is_narration())
            .and_then(|s| s.resolved_voice.clone())
        {
            cast.push(CastMember {
                character: NARRATOR.to_string(),
                gender: Gender::Unknown,
                voice_label: voice.label(),
                voice,
            });
        }

        for segment in script.iter().filter(|s| s.is_dialogue()) {
            if cast.iter().any(|c| c.character == segment.character) {
                continue;
            }
            if let Some(voice) = segment.resolved_voice.clone() {
                cast.push(CastMember {
                    character: segment.character.clone(),
                    gender: segment.gender,
                    voice_label: voice.label(),
                    voice,
                });
            }
        }

        cast
    }
}

/// Stable pool index for a character name
fn pool_index(character: &str, len: usize) -> usize {
    let digest = Sha256::digest(character.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % len as u64) as usize
}
