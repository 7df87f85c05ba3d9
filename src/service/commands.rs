//! Parsing of customer chat input.
//!
//! Input is matched after trimming and uppercasing. Numeric shortcuts only
//! apply outside a dialogue (see [`Command::parse`]).

use std::sync::LazyLock;

use regex::Regex;

/// Words that greet the bot and bring up the menu.
pub const GREETINGS: [&str; 10] = [
    "OI", "OLA", "OLÁ", "HELLO", "HI", "EAI", "E AÍ", "BOM DIA", "BOA TARDE", "BOA NOITE",
];

const BACK_TO_MENU: [&str; 5] = ["0", "MENU", "INÍCIO", "INICIO", "VOLTAR"];

const YES: [&str; 3] = ["S", "SIM", "CONFIRMO"];
const NO: [&str; 4] = ["N", "NAO", "NÃO", "CANCELAR"];

static RECEIPT_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*COMPROVANTE\s+([A-Za-z0-9\-._]+)\s*$").ok());

fn normalized(text: &str) -> String {
    text.trim().to_uppercase()
}

/// A top-level menu command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show the container.
    Container,
    /// Show the LudoCoin balance.
    Ludocoins,
    /// Start a trade-in.
    Trocar,
    /// Request shipment.
    Enviar,
    /// Show the help text.
    Ajuda,
    /// Start a receipt upload.
    Comprovante,
}

impl Command {
    /// Parses a command from its first word, or from a digit `1`-`6` when
    /// `numeric_shortcuts` is set.
    #[must_use]
    pub fn parse(text: &str, numeric_shortcuts: bool) -> Option<Self> {
        let text = normalized(text);
        if numeric_shortcuts {
            let shortcut = match text.as_str() {
                "1" => Some(Self::Container),
                "2" => Some(Self::Ludocoins),
                "3" => Some(Self::Trocar),
                "4" => Some(Self::Enviar),
                "5" => Some(Self::Ajuda),
                "6" => Some(Self::Comprovante),
                _ => None,
            };
            if shortcut.is_some() {
                return shortcut;
            }
        }

        let first = text
            .split_whitespace()
            .next()?
            .trim_end_matches(|c: char| !c.is_alphanumeric());
        match first {
            "CONTAINER" => Some(Self::Container),
            "LUDOCOINS" => Some(Self::Ludocoins),
            "TROCAR" => Some(Self::Trocar),
            "ENVIAR" => Some(Self::Enviar),
            "AJUDA" => Some(Self::Ajuda),
            "COMPROVANTE" => Some(Self::Comprovante),
            _ => None,
        }
    }
}

/// Whether the text is a greeting.
#[must_use]
pub fn is_greeting(text: &str) -> bool {
    GREETINGS.contains(&normalized(text).as_str())
}

/// Whether the text asks to go back to the menu.
#[must_use]
pub fn is_back_to_menu(text: &str) -> bool {
    BACK_TO_MENU.contains(&normalized(text).as_str())
}

/// Reads a yes/no answer. `None` for anything else.
#[must_use]
pub fn parse_confirmation(text: &str) -> Option<bool> {
    let text = normalized(text);
    if YES.contains(&text.as_str()) {
        Some(true)
    } else if NO.contains(&text.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Extracts the transaction id of a `COMPROVANTE <id>` message.
#[must_use]
pub fn parse_receipt(text: &str) -> Option<String> {
    RECEIPT_PATTERN
        .as_ref()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

/// Whether the text is only digits and spaces (and not blank).
#[must_use]
pub fn is_index_list(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit() || c == ' ')
}

/// Resolves 1-based indices against `candidates`, ignoring out-of-range
/// and repeated indices, keeping first-mention order.
#[must_use]
pub fn select_by_indices<T: Clone>(candidates: &[T], text: &str) -> Vec<T> {
    let mut seen = Vec::new();
    let mut chosen = Vec::new();
    for index in text.split_whitespace().filter_map(|t| t.parse::<usize>().ok()) {
        if seen.contains(&index) {
            continue;
        }
        if let Some(candidate) = index.checked_sub(1).and_then(|i| candidates.get(i)) {
            seen.push(index);
            chosen.push(candidate.clone());
        }
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcuts_only_when_enabled() {
        assert_eq!(Command::parse("3", true), Some(Command::Trocar));
        assert_eq!(Command::parse(" 6 ", true), Some(Command::Comprovante));
        assert_eq!(Command::parse("3", false), None);
        assert_eq!(Command::parse("7", true), None);
    }

    #[test]
    fn words_match_on_first_token() {
        assert_eq!(Command::parse("container", false), Some(Command::Container));
        assert_eq!(Command::parse("Enviar meu container", false), Some(Command::Enviar));
        assert_eq!(Command::parse("ludocoins?", false), Some(Command::Ludocoins));
        assert_eq!(Command::parse("quero trocar", false), None);
        assert_eq!(Command::parse("", true), None);
    }

    #[test]
    fn greetings_and_menu_words() {
        assert!(is_greeting("olá"));
        assert!(is_greeting("  Bom dia "));
        assert!(is_greeting("e aí"));
        assert!(!is_greeting("oi tudo bem"));
        assert!(is_back_to_menu("Início"));
        assert!(is_back_to_menu("0"));
        assert!(!is_back_to_menu("00"));
    }

    #[test]
    fn confirmations() {
        assert_eq!(parse_confirmation("sim"), Some(true));
        assert_eq!(parse_confirmation(" s "), Some(true));
        assert_eq!(parse_confirmation("não"), Some(false));
        assert_eq!(parse_confirmation("Cancelar"), Some(false));
        assert_eq!(parse_confirmation("talvez"), None);
    }

    #[test]
    fn receipt_pattern() {
        assert_eq!(parse_receipt("COMPROVANTE TX-123"), Some("TX-123".to_string()));
        assert_eq!(parse_receipt("  comprovante a.b_c-9  "), Some("a.b_c-9".to_string()));
        assert_eq!(parse_receipt("COMPROVANTE"), None);
        assert_eq!(parse_receipt("COMPROVANTE 12 34"), None);
        assert_eq!(parse_receipt("COMPROVANTE pix#1"), None);
    }

    #[test]
    fn index_selection_ignores_invalid_and_duplicates() {
        let list = ["a", "b", "c"];
        assert_eq!(select_by_indices(&list, "1 3"), vec!["a", "c"]);
        assert_eq!(select_by_indices(&list, "3 3 1 9 0"), vec!["c", "a"]);
        assert!(select_by_indices(&list, "0 4").is_empty());
        assert!(select_by_indices(&list, "99999999999999999999999").is_empty());
    }

    #[test]
    fn index_list_shape() {
        assert!(is_index_list("1 2  3"));
        assert!(!is_index_list("1,2"));
        assert!(!is_index_list("   "));
        assert!(!is_index_list("um"));
    }
}
