/*!
 * Static voice tables.
 *
 * Each backend carries, per language, one narrator voice, a default
 * dialogue voice per gender and the pools characters are hashed into.
 */

use crate::language_utils::VoiceLanguage;
use crate::script::Gender;

use super::BackendKind;

/// Voices of one backend for one language
#[derive(Debug, Clone, Copy)]
pub struct VoiceTable {
    pub narrator: &'static str,
    // @field: Dialogue voice for speakers of unknown gender
    pub fallback: &'static str,
    pub male: &'static [&'static str],
    pub female: &'static [&'static str],
}

impl VoiceTable {
    /// Pool for a gender; `None` means use the default voice
    pub fn pool(&self, gender: Gender) -> Option<&'static [&'static str]> {
        match gender {
            Gender::Male => Some(self.male),
            Gender::Female => Some(self.female),
            Gender::Unknown => None,
        }
    }

    /// Fallback dialogue voice
    pub fn default_voice(&self) -> &'static str {
        self.fallback
    }
}

const ELEVENLABS_MALE: &[&str] = &[
    "pNInz6obpgDQGcFmaJgB",
    "ErXwobaYiN019PkySvjV",
    "VR6AewLTigWG4xSOukaG",
    "N2lVS1w4EtoT3dr4eOWO",
    "IKne3meq5aSn9XLyUdCD",
    "2EiwWnXFnvU5JabPnv8n",
    "CYw3kZ02Hs0563khs1Fj",
    "D38z5RcWu1voky8WS1ja",
    "JBFqnCBsd6RMkjVDRZzb",
    "TxGEqnHWrfWFTfGW9XjX",
    "ODq5zmih8GrVes37Dizd",
    "yoZ06aMxZJJ28mfd3POQ",
    "GBv7mTt0atIp3Br8iCZE",
];

const ELEVENLABS_FEMALE: &[&str] = &[
    "21m00Tcm4TlvDq8ikWAM",
    "EXAVITQu4vr4xnSDxMaL",
    "XB0fDUnXU5powFXDhCwa",
    "AZnzlk1XvdvUeBnXmlld",
    "ThT5KcBeYPX3keUQqHPh",
    "MF3mGyEYCl7XYWbV9V6O",
    "LcfcDJNUP1GQjkzn1xUU",
    "jsCqWAovK2LkecY7zXl4",
    "jBpfuIE2acCO8z3wKNLl",
    "z9fAnlkpzviPz146aGWa",
    "oWAxZDx7w5VEj9dCyTzz",
    "cgSgspJ2msm6clMCkdW9",
    "pFZP5JQG7iQjIQuC4Bku",
    "XrExE9yKIg1WjnnlVkGX",
    "piTKgcLEGmPE4e6mEKli",
];

// ElevenLabs voices are multilingual, so one table serves both languages
const ELEVENLABS: VoiceTable = VoiceTable {
    narrator: "pNInz6obpgDQGcFmaJgB",
    fallback: "pNInz6obpgDQGcFmaJgB",
    male: ELEVENLABS_MALE,
    female: ELEVENLABS_FEMALE,
};

const OPENAI: VoiceTable = VoiceTable {
    narrator: "onyx",
    fallback: "onyx",
    male: &["onyx", "echo", "fable"],
    female: &["alloy", "nova", "shimmer"],
};

const AZURE_EN: VoiceTable = VoiceTable {
    narrator: "en-US-BrianNeural",
    fallback: "en-US-GuyNeural",
    male: &["en-US-GuyNeural", "en-US-DavisNeural", "en-US-TonyNeural"],
    female: &["en-US-JennyNeural", "en-US-AriaNeural", "en-GB-SoniaNeural"],
};

const AZURE_ZH: VoiceTable = VoiceTable {
    narrator: "zh-CN-YunxiNeural",
    fallback: "zh-CN-YunjianNeural",
    male: &["zh-CN-YunjianNeural", "zh-CN-YunyangNeural"],
    female: &["zh-CN-XiaoxiaoNeural", "zh-CN-XiaoyiNeural"],
};

const GOOGLE_EN: VoiceTable = VoiceTable {
    narrator: "en-US-Neural2-J",
    fallback: "en-US-Neural2-J",
    male: &[
        "en-US-Neural2-A",
        "en-US-Neural2-D",
        "en-US-Neural2-I",
        "en-US-Neural2-J",
        "en-US-Wavenet-A",
        "en-US-Wavenet-B",
        "en-US-Wavenet-D",
        "en-GB-Neural2-B",
        "en-GB-Neural2-D",
    ],
    female: &[
        "en-US-Neural2-C",
        "en-US-Neural2-E",
        "en-US-Neural2-F",
        "en-US-Neural2-G",
        "en-US-Neural2-H",
        "en-US-Wavenet-C",
        "en-US-Wavenet-E",
        "en-US-Wavenet-F",
        "en-GB-Neural2-A",
        "en-GB-Neural2-C",
    ],
};

const GOOGLE_ZH: VoiceTable = VoiceTable {
    narrator: "cmn-CN-Wavenet-C",
    fallback: "cmn-CN-Wavenet-C",
    male: &["cmn-CN-Wavenet-C", "cmn-CN-Wavenet-B", "cmn-TW-Wavenet-B", "cmn-TW-Wavenet-C"],
    female: &["cmn-CN-Wavenet-A", "cmn-CN-Wavenet-D", "cmn-TW-Wavenet-A"],
};

const OPENAI_VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

const LABELS: &[(&str, &str)] = &[
    ("en-US-BrianNeural", "Brian (Narrator)"),
    ("zh-CN-YunxiNeural", "Yunxi (Narrator)"),
    ("en-US-Neural2-A", "Steven (Classic)"),
    ("en-US-Neural2-C", "Sarah (Bright)"),
    ("en-US-Neural2-D", "Robert (Deep)"),
    ("en-US-Neural2-E", "Emily (Soft)"),
    ("en-US-Neural2-F", "Jennifer (Warm)"),
    ("en-US-Neural2-H", "Helen (Mature)"),
    ("en-US-Neural2-I", "David (Strong)"),
    ("en-US-Neural2-J", "Michael (Energetic)"),
    ("en-US-Wavenet-A", "James (Standard)"),
    ("en-US-Wavenet-B", "John (Formal)"),
    ("en-US-Wavenet-C", "Mary (Sweet)"),
    ("en-US-Wavenet-D", "William (Deep)"),
    ("en-US-Wavenet-E", "Patricia (Soft)"),
    ("en-US-Wavenet-F", "Linda (Warm)"),
    ("cmn-CN-Wavenet-A", "Xiaoyan (Sweet)"),
    ("cmn-CN-Wavenet-B", "Yunyang (Broadcast)"),
    ("cmn-CN-Wavenet-C", "Yunxi (Story)"),
    ("cmn-CN-Wavenet-D", "Xiaoxiao (Friendly)"),
    ("onyx", "Onyx (Deep Male)"),
    ("alloy", "Alloy (Clear Female)"),
    ("echo", "Echo (Narrator)"),
    ("fable", "Fable (Expressive)"),
    ("nova", "Nova (Energetic)"),
    ("shimmer", "Shimmer (Soft)"),
    ("pNInz6obpgDQGcFmaJgB", "Adam (Deep)"),
    ("21m00Tcm4TlvDq8ikWAM", "Rachel (Warm)"),
    ("ErXwobaYiN019PkySvjV", "Antoni (Young)"),
    ("VR6AewLTigWG4xSOukaG", "Arnold (Strong)"),
    ("N2lVS1w4EtoT3dr4eOWO", "Callum (Calm)"),
    ("IKne3meq5aSn9XLyUdCD", "Charlie (Friendly)"),
    ("2EiwWnXFnvU5JabPnv8n", "Clyde (Warm)"),
    ("CYw3kZ02Hs0563khs1Fj", "Dave (Young UK)"),
    ("D38z5RcWu1voky8WS1ja", "Fin (Irish)"),
    ("JBFqnCBsd6RMkjVDRZzb", "George (Formal UK)"),
    ("TxGEqnHWrfWFTfGW9XjX", "Josh (News)"),
    ("ODq5zmih8GrVes37Dizd", "Patrick (Authoritative)"),
    ("yoZ06aMxZJJ28mfd3POQ", "Sam (Lively)"),
    ("GBv7mTt0atIp3Br8iCZE", "Thomas (Gentle)"),
    ("EXAVITQu4vr4xnSDxMaL", "Bella (Soft)"),
    ("XB0fDUnXU5powFXDhCwa", "Charlotte (Elegant)"),
    ("AZnzlk1XvdvUeBnXmlld", "Domi (Energetic)"),
    ("ThT5KcBeYPX3keUQqHPh", "Dorothy (Wise)"),
    ("MF3mGyEYCl7XYWbV9V6O", "Elli (Lively)"),
    ("LcfcDJNUP1GQjkzn1xUU", "Emily (Calm)"),
    ("jsCqWAovK2LkecY7zXl4", "Freya (Young US)"),
    ("jBpfuIE2acCO8z3wKNLl", "Gigi (Enthusiastic)"),
    ("z9fAnlkpzviPz146aGWa", "Glinda (Mysterious)"),
    ("oWAxZDx7w5VEj9dCyTzz", "Grace (Southern)"),
    ("cgSgspJ2msm6clMCkdW9", "Jessica (Professional)"),
    ("pFZP5JQG7iQjIQuC4Bku", "Lily (Young UK)"),
    ("XrExE9yKIg1WjnnlVkGX", "Matilda (Narrative)"),
    ("piTKgcLEGmPE4e6mEKli", "Nicole (Whisper)"),
];

/// Lookup over the static voice tables
pub struct VoiceCatalog;

impl VoiceCatalog {
    /// Voice table of a backend for a language
    pub fn table(backend: BackendKind, language: VoiceLanguage) -> &'static VoiceTable {
        match (backend, language) {
            (BackendKind::ElevenLabs, _) => &ELEVENLABS,
            (BackendKind::OpenAI, _) => &OPENAI,
            (BackendKind::Azure, VoiceLanguage::English) => &AZURE_EN,
            (BackendKind::Azure, VoiceLanguage::Chinese) => &AZURE_ZH,
            (BackendKind::Google, VoiceLanguage::English) => &GOOGLE_EN,
            (BackendKind::Google, VoiceLanguage::Chinese) => &GOOGLE_ZH,
        }
    }

    /// Narrator voice of a backend for a language
    pub fn narrator_voice(backend: BackendKind, language: VoiceLanguage) -> &'static str {
        Self::table(backend, language).narrator
    }

    /// Human-readable label, falling back to the id itself
    pub fn label(voice_id: &str) -> String {
        LABELS
            .iter()
            .find(|(id, _)| *id == voice_id)
            .map(|(_, label)| (*label).to_string())
            .unwrap_or_else(|| voice_id.to_string())
    }

    /// Guess the backend of a bare voice id from its shape
    pub fn infer_backend(voice_id: &str) -> Option<BackendKind> {
        let voice_id = voice_id.trim();
        if OPENAI_VOICES.contains(&voice_id.to_lowercase().as_str()) {
            Some(BackendKind::OpenAI)
        } else if voice_id.contains("Neural2") || voice_id.contains("Wavenet") {
            Some(BackendKind::Google)
        } else if voice_id.ends_with("Neural") {
            Some(BackendKind::Azure)
        } else if voice_id.len() >= 16 && voice_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            Some(BackendKind::ElevenLabs)
        } else {
            None
        }
    }

    /// Resolve a manual voice choice, optionally namespaced as "backend:voice"
    pub fn parse_override(raw: &str) -> Option<(BackendKind, String)> {
        let raw = raw.trim();
        if let Some((prefix, voice)) = raw.split_once(':') {
            if let Some(backend) = BackendKind::parse(prefix) {
                let voice = voice.trim();
                return (!voice.is_empty()).then(|| (backend, voice.to_string()));
            }
        }
        Self::infer_backend(raw).map(|backend| (backend, raw.to_string()))
    }
}
