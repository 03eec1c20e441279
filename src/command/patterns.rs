//! Trigger phrase tables
//!
//! Each (intent, language) pair maps to an ordered phrase list. Specific
//! phrases come before the generic one-word fallbacks, and the parser tries
//! them in exactly this order.
//!
//! Matching is by substring, so a generic phrase can hide inside a phrase of
//! a later intent ("connect" inside "disconnect"). Such intents list the
//! longer phrase as an exclusion: if the text contains it, the intent is
//! skipped and the next one in priority order is tried.

use super::CommandType;
use std::collections::HashMap;

/// Language used when a tag has no table of its own
pub const FALLBACK_LANGUAGE: &str = "en";

/// A recognition language offered to the user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Language {
    /// BCP 47 tag handed to the recognition engine
    pub tag: &'static str,
    /// Display name
    pub name: &'static str,
}

/// Languages the recognition session can be configured with
pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language { tag: "en-US", name: "English (US)" },
    Language { tag: "en-IN", name: "English (India)" },
    Language { tag: "hi-IN", name: "हिंदी (Hindi)" },
    Language { tag: "es-ES", name: "Español (Spanish)" },
    Language { tag: "de-DE", name: "Deutsch (German)" },
    Language { tag: "pt-BR", name: "Português (Portuguese)" },
    Language { tag: "fr-FR", name: "Français (French)" },
    Language { tag: "it-IT", name: "Italiano (Italian)" },
    Language { tag: "ja-JP", name: "日本語 (Japanese)" },
    Language { tag: "ko-KR", name: "한국어 (Korean)" },
    Language { tag: "zh-CN", name: "中文 (Chinese)" },
    Language { tag: "ru-RU", name: "Русский (Russian)" },
];

impl Language {
    /// Look up a supported language by tag (case-insensitive)
    pub fn find(tag: &str) -> Option<&'static Language> {
        SUPPORTED_LANGUAGES
            .iter()
            .find(|l| l.tag.eq_ignore_ascii_case(tag.trim()))
    }

    /// Check if a tag is in the supported set
    pub fn is_supported(tag: &str) -> bool {
        Self::find(tag).is_some()
    }
}

/// Two-letter base code of a language tag (`en-US` -> `en`)
pub fn base_language(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Phrases for one intent in one language
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntentPhrases {
    /// Trigger phrases, lowercase, in match order
    pub phrases: Vec<String>,
    /// Phrases that veto this intent when present
    pub exclusions: Vec<String>,
}

impl IntentPhrases {
    fn new(phrases: &[&str], exclusions: &[&str]) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.to_lowercase()).collect(),
            exclusions: exclusions.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// First phrase (in table order) contained in already-normalized text
    pub fn first_match(&self, text: &str) -> Option<&str> {
        if self.exclusions.iter().any(|e| text.contains(e.as_str())) {
            return None;
        }
        self.phrases
            .iter()
            .find(|p| text.contains(p.as_str()))
            .map(String::as_str)
    }
}

/// Read-only mapping `(intent, language) -> phrases`
#[derive(Clone, Debug, Default)]
pub struct PatternTable {
    languages: HashMap<String, HashMap<CommandType, IntentPhrases>>,
}

/// (language, intent, phrases, exclusions)
type TableRow = (
    &'static str,
    CommandType,
    &'static [&'static str],
    &'static [&'static str],
);

const BUILTIN: &[TableRow] = &[
    // English
    ("en", CommandType::Connect, &["connect wallet", "connect my wallet", "wallet connect", "link wallet", "connect"], &["disconnect"]),
    ("en", CommandType::Disconnect, &["disconnect wallet", "disconnect my wallet", "wallet disconnect", "disconnect", "logout", "log out"], &[]),
    ("en", CommandType::Balance, &["check balance", "check my balance", "show balance", "my balance", "balance check", "balance", "check"], &[]),
    ("en", CommandType::Account, &["show my account", "show account", "my account", "wallet address", "show address", "my address", "account"], &[]),
    ("en", CommandType::Send, &["send eth", "send", "transfer", "payment", "pay"], &[]),
    // Hindi
    ("hi", CommandType::Connect, &["वॉलेट कनेक्ट", "कनेक्ट करो", "कनेक्ट"], &["डिस्कनेक्ट"]),
    ("hi", CommandType::Disconnect, &["वॉलेट डिस्कनेक्ट", "डिस्कनेक्ट करो", "डिस्कनेक्ट"], &[]),
    ("hi", CommandType::Balance, &["बैलेंस चेक", "मेरा बैलेंस", "बैलेंस दिखाओ", "बैलेंस", "चेक"], &[]),
    ("hi", CommandType::Account, &["मेरा अकाउंट", "अकाउंट दिखाओ", "मेरा पता", "अकाउंट"], &[]),
    ("hi", CommandType::Send, &["ईटीएच भेजो", "भेजो", "ट्रांसफर", "पेमेंट"], &[]),
    // Spanish
    ("es", CommandType::Connect, &["conectar billetera", "conectar cartera", "conectar"], &["desconectar"]),
    ("es", CommandType::Disconnect, &["desconectar billetera", "desconectar cartera", "desconectar", "cerrar sesión"], &[]),
    ("es", CommandType::Balance, &["verificar saldo", "mostrar saldo", "mi saldo", "saldo"], &[]),
    ("es", CommandType::Account, &["mostrar mi cuenta", "mi cuenta", "mi dirección", "cuenta"], &[]),
    ("es", CommandType::Send, &["enviar eth", "enviar", "transferir", "pagar"], &[]),
    // German
    ("de", CommandType::Connect, &["wallet verbinden", "geldbörse verbinden", "verbinden"], &[]),
    ("de", CommandType::Disconnect, &["wallet trennen", "verbindung trennen", "trennen", "abmelden"], &[]),
    ("de", CommandType::Balance, &["saldo prüfen", "guthaben anzeigen", "mein guthaben", "guthaben", "kontostand"], &[]),
    ("de", CommandType::Account, &["mein konto", "konto anzeigen", "meine adresse", "konto"], &[]),
    ("de", CommandType::Send, &["eth senden", "senden", "überweisen", "bezahlen"], &[]),
    // Portuguese
    ("pt", CommandType::Connect, &["conectar carteira", "ligar carteira", "conectar"], &["desconectar"]),
    ("pt", CommandType::Disconnect, &["desconectar carteira", "desconectar", "sair da carteira"], &[]),
    ("pt", CommandType::Balance, &["verificar saldo", "mostrar saldo", "meu saldo", "saldo"], &[]),
    ("pt", CommandType::Account, &["minha conta", "mostrar conta", "meu endereço", "conta"], &[]),
    ("pt", CommandType::Send, &["enviar eth", "enviar", "transferir", "pagar"], &[]),
    // French
    ("fr", CommandType::Connect, &["connecter portefeuille", "lier portefeuille", "connecter"], &["déconnecter"]),
    ("fr", CommandType::Disconnect, &["déconnecter portefeuille", "se déconnecter", "déconnecter"], &[]),
    ("fr", CommandType::Balance, &["vérifier solde", "afficher solde", "mon solde", "solde"], &[]),
    ("fr", CommandType::Account, &["mon compte", "afficher compte", "mon adresse", "compte"], &[]),
    ("fr", CommandType::Send, &["envoyer eth", "envoyer", "transférer", "payer"], &[]),
    // Italian
    ("it", CommandType::Connect, &["connetti portafoglio", "collegare portafoglio", "connetti"], &["disconnetti"]),
    ("it", CommandType::Disconnect, &["disconnetti portafoglio", "disconnetti", "scollega"], &[]),
    ("it", CommandType::Balance, &["controlla saldo", "mostra saldo", "il mio saldo", "saldo"], &[]),
    ("it", CommandType::Account, &["il mio account", "mostra account", "il mio indirizzo", "account"], &[]),
    ("it", CommandType::Send, &["invia eth", "invia", "trasferisci", "paga"], &[]),
    // Japanese
    ("ja", CommandType::Connect, &["ウォレット接続", "接続", "つなぐ"], &["接続解除"]),
    ("ja", CommandType::Disconnect, &["ウォレット切断", "接続解除", "切断"], &[]),
    ("ja", CommandType::Balance, &["残高確認", "残高表示", "私の残高", "残高"], &[]),
    ("ja", CommandType::Account, &["アカウント表示", "私のアカウント", "アドレス", "アカウント"], &[]),
    ("ja", CommandType::Send, &["eth送信", "送信", "転送", "支払い"], &[]),
    // Korean
    ("ko", CommandType::Connect, &["지갑 연결", "지갑연결", "연결"], &["연결 해제", "연결해제"]),
    ("ko", CommandType::Disconnect, &["지갑 연결 해제", "연결 해제", "연결해제"], &[]),
    ("ko", CommandType::Balance, &["잔액 확인", "잔액 보기", "내 잔액", "잔액"], &[]),
    ("ko", CommandType::Account, &["내 계정", "계정 보기", "내 주소", "계정"], &[]),
    ("ko", CommandType::Send, &["eth 보내기", "보내기", "전송", "지불"], &[]),
    // Chinese
    ("zh", CommandType::Connect, &["连接钱包", "链接钱包", "连接"], &["断开连接"]),
    ("zh", CommandType::Disconnect, &["断开钱包", "断开连接", "断开"], &[]),
    ("zh", CommandType::Balance, &["检查余额", "显示余额", "我的余额", "余额"], &[]),
    ("zh", CommandType::Account, &["我的账户", "显示账户", "我的地址", "账户"], &[]),
    ("zh", CommandType::Send, &["发送eth", "发送", "转账", "支付"], &[]),
    // Russian
    ("ru", CommandType::Connect, &["подключить кошелек", "связать кошелек", "подключить"], &[]),
    ("ru", CommandType::Disconnect, &["отключить кошелек", "отключить", "выйти"], &[]),
    ("ru", CommandType::Balance, &["проверить баланс", "показать баланс", "мой баланс", "баланс"], &[]),
    ("ru", CommandType::Account, &["мой аккаунт", "показать аккаунт", "мой адрес", "аккаунт"], &[]),
    ("ru", CommandType::Send, &["отправить eth", "отправить", "перевести", "заплатить"], &[]),
];

impl PatternTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in tables for every supported language
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (language, intent, phrases, exclusions) in BUILTIN {
            table.insert(language, *intent, phrases, exclusions);
        }
        table
    }

    /// Add or replace the phrases for one intent in one language
    pub fn insert(
        &mut self,
        language: &str,
        intent: CommandType,
        phrases: &[&str],
        exclusions: &[&str],
    ) {
        self.languages
            .entry(base_language(language))
            .or_default()
            .insert(intent, IntentPhrases::new(phrases, exclusions));
    }

    /// Builder form of [`PatternTable::insert`]
    pub fn with_phrases(
        mut self,
        language: &str,
        intent: CommandType,
        phrases: &[&str],
        exclusions: &[&str],
    ) -> Self {
        self.insert(language, intent, phrases, exclusions);
        self
    }

    /// Check if a base language code has its own table
    pub fn has_language(&self, code: &str) -> bool {
        self.languages.contains_key(code)
    }

    /// Base code whose table applies to a language tag
    ///
    /// Falls back to English when the tag's base language has no table.
    pub fn resolve_language(&self, tag: &str) -> String {
        let code = base_language(tag);
        if self.has_language(&code) {
            code
        } else {
            FALLBACK_LANGUAGE.to_string()
        }
    }

    /// Phrases for an intent in a base language
    pub fn phrases(&self, intent: CommandType, code: &str) -> Option<&IntentPhrases> {
        self.languages.get(code).and_then(|l| l.get(&intent))
    }

    /// Base language codes with a table
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    /// Every `(language, intent, phrase)` entry in the table
    pub fn entries(&self) -> impl Iterator<Item = (&str, CommandType, &str)> {
        self.languages.iter().flat_map(|(code, intents)| {
            intents.iter().flat_map(move |(intent, phrases)| {
                phrases
                    .phrases
                    .iter()
                    .map(move |p| (code.as_str(), *intent, p.as_str()))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_language() {
        assert_eq!(base_language("en-US"), "en");
        assert_eq!(base_language("hi-IN"), "hi");
        assert_eq!(base_language("pt_BR"), "pt");
        assert_eq!(base_language("ZH"), "zh");
        assert_eq!(base_language(""), "");
    }

    #[test]
    fn test_builtin_covers_all_supported_languages() {
        let table = PatternTable::builtin();
        for language in SUPPORTED_LANGUAGES {
            let code = base_language(language.tag);
            for intent in CommandType::PRIORITY {
                let phrases = table.phrases(intent, &code);
                assert!(
                    phrases.is_some_and(|p| !p.phrases.is_empty()),
                    "missing {} phrases for {}",
                    intent,
                    code
                );
            }
        }
    }

    #[test]
    fn test_resolve_language_falls_back_to_english() {
        let table = PatternTable::builtin();
        assert_eq!(table.resolve_language("ja-JP"), "ja");
        assert_eq!(table.resolve_language("nl-NL"), "en");
        assert_eq!(table.resolve_language(""), "en");
    }

    #[test]
    fn test_phrases_keep_table_order() {
        let table = PatternTable::builtin();
        let connect = table.phrases(CommandType::Connect, "en").unwrap();
        assert_eq!(connect.phrases.first().map(String::as_str), Some("connect wallet"));
        assert_eq!(connect.phrases.last().map(String::as_str), Some("connect"));
    }

    #[test]
    fn test_exclusion_vetoes_intent() {
        let table = PatternTable::builtin();
        let connect = table.phrases(CommandType::Connect, "en").unwrap();
        assert_eq!(connect.first_match("connect my wallet"), Some("connect my wallet"));
        assert_eq!(connect.first_match("disconnect"), None);
    }

    #[test]
    fn test_insert_lowercases_phrases() {
        let table = PatternTable::new().with_phrases("nl-NL", CommandType::Balance, &["Saldo Tonen"], &[]);
        assert!(table.has_language("nl"));
        let balance = table.phrases(CommandType::Balance, "nl").unwrap();
        assert_eq!(balance.phrases, vec!["saldo tonen".to_string()]);
    }

    #[test]
    fn test_language_lookup() {
        assert!(Language::is_supported("en-IN"));
        assert!(Language::is_supported("ko-kr"));
        assert!(!Language::is_supported("nl-NL"));
        assert_eq!(Language::find("ru-RU").map(|l| l.name), Some("Русский (Russian)"));
    }
}
