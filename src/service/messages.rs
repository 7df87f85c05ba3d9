//! Texts the bot sends to customers.

use crate::domain::{CoinTransaction, ContainerItem, ItemStatus, Shipment, TradeCandidate};

/// Asks an unknown number for a name.
pub const ONBOARD_PROMPT: &str = "Oi! Eu sou o *Ludinho* 🤖\nParece que é sua primeira vez aqui. Como você gostaria de ser chamado(a)?";
/// Name too short.
pub const ONBOARD_NAME_TOO_SHORT: &str =
    "Humm, esse nome ficou muito curtinho. Pode me dizer seu nome completo? 🙂";
/// Generic "try later" for the container view.
pub const CONTAINER_UNAVAILABLE: &str =
    "Não consegui acessar seu container agora. Tente novamente mais tarde.";
/// Generic "try later" for the balance view.
pub const BALANCE_UNAVAILABLE: &str =
    "Não consegui consultar seu saldo agora. Tente novamente mais tarde.";
/// Generic "try later" for the trade list.
pub const TRADE_LIST_UNAVAILABLE: &str =
    "Não consegui listar itens elegíveis agora. Tente novamente mais tarde.";
/// Nothing to trade.
pub const NOTHING_TO_TRADE: &str = "Não há itens elegíveis para troca no momento.";
/// Trade selection was not numeric.
pub const TRADE_NOT_NUMERIC: &str =
    "Por favor, responda só com os números dos itens que deseja trocar. Ex: *1 3*";
/// No valid index in the selection.
pub const TRADE_INVALID_INDEX: &str = "Índice inválido. Tente novamente.";
/// Trade declined.
pub const TRADE_CANCELLED: &str = "Sem problemas — operação cancelada. Se quiser, digite *3* para listar novamente os itens elegíveis.";
/// No conversion went through.
pub const TRADE_FAILED: &str =
    "Não consegui converter os itens agora. Tente novamente mais tarde.";
/// Yes/no reprompt.
pub const YES_NO_REPROMPT: &str = "Responda apenas com *S* (sim) ou *N* (não).";
/// Nothing to ship.
pub const NOTHING_TO_SHIP: &str =
    "Não consigo criar envio: seu container está vazio ou só tem itens em PRÉ-VENDA.";
/// Address placeholder.
pub const NO_ADDRESS: &str = "(endereço não cadastrado)";
/// Shipment insert failed.
pub const SHIPMENT_FAILED: &str = "Não consegui criar o pedido agora. Tente novamente mais tarde.";
/// Shipment declined.
pub const SHIPMENT_CANCELLED: &str =
    "Beleza! Pedido cancelado. Se quiser tentar de novo, mande *4* (ENVIAR).";
/// How to send a receipt.
pub const RECEIPT_INSTRUCTIONS: &str =
    "Para enviar seu comprovante, anexe um PDF ou imagem e escreva: COMPROVANTE <ID_DA_TRANSACAO>";
/// Receipt command came without a file.
pub const RECEIPT_MISSING_FILE: &str =
    "Por favor, anexe um PDF ou imagem e envie novamente com: COMPROVANTE <ID_DA_TRANSACAO>.";
/// Receipt command came without a file while the bot was waiting for one.
pub const RECEIPT_MISSING_FILE_WAITING: &str = "Parece que não veio arquivo. Anexe um PDF/Imagem e envie novamente com: COMPROVANTE <ID_DA_TRANSACAO>.";
/// Anything but a receipt while waiting for one.
pub const RECEIPT_FORMAT_REPROMPT: &str =
    "Envie a mensagem no formato: COMPROVANTE <ID_DA_TRANSACAO>, com o arquivo anexado.";
/// No receiving number configured.
pub const RECEIPT_NO_DESTINATION: &str =
    "Ainda não há um número configurado para receber comprovantes. Tente mais tarde.";
/// Receipt forwarded.
pub const RECEIPT_FORWARDED: &str = "Comprovante encaminhado. Obrigado! ✅";
/// Receipt forwarding failed.
pub const RECEIPT_FORWARD_FAILED: &str =
    "Não consegui encaminhar o comprovante agora. Tente novamente mais tarde.";

/// The main menu.
#[must_use]
pub fn menu() -> String {
    [
        "🤖 *Ludinho* — como posso ajudar?",
        "",
        "1) CONTAINER",
        "2) LUDOCOINS",
        "3) TROCAR (Listinha → L$)",
        "4) ENVIAR Container",
        "5) AJUDA",
        "6) COMPROVANTE (enviar)",
        "0) MENU (voltar)",
        "",
        "_Você pode responder pelo número (ex: 3) ou pelo texto (ex: TROCAR)._",
    ]
    .join("\n")
}

/// Greeting after onboarding.
#[must_use]
pub fn welcome(name: &str) -> String {
    format!("Perfeito, *{name}*! 🙌\n{}", menu())
}

/// Reply to unrecognized input.
#[must_use]
pub fn fallback() -> String {
    format!("Não entendi 🤔\n{}", menu())
}

/// What each command does, followed by the menu.
#[must_use]
pub fn help() -> String {
    format!(
        "ℹ️ *Como funciona*\n\n\
         *CONTAINER*: mostra os jogos guardados no seu container.\n\
         *LUDOCOINS*: mostra seu saldo de L$ e as últimas movimentações.\n\
         *TROCAR*: converte itens da LISTINHA em L$ (85% do valor pago).\n\
         *ENVIAR*: pede o envio dos itens disponíveis do seu container.\n\
         *COMPROVANTE <ID>*: encaminha um comprovante de pagamento (anexe o arquivo).\n\n{}",
        menu()
    )
}

fn title_case(label: &str) -> String {
    let lower = label.to_lowercase();
    let mut chars = lower.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// Container view split into available and pre-sale sections. Items are
/// numbered across both sections in listing order.
#[must_use]
pub fn container_view(items: &[ContainerItem]) -> String {
    let mut available = Vec::new();
    let mut presale = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let line = format!(
            "{}. {} ({}, {})",
            i + 1,
            item.display_name(),
            title_case(item.origin.as_ref()),
            item.status
        );
        if item.status == ItemStatus::PreVenda {
            presale.push(line);
        } else {
            available.push(line);
        }
    }

    let section = |lines: Vec<String>| {
        if lines.is_empty() {
            "—".to_string()
        } else {
            lines.join("\n")
        }
    };
    format!(
        "📦 *Seu Container*\n\n*DISPONÍVEIS*\n{}\n\n*PRÉ-VENDA*\n{}\n\n\
         Dicas: você pode *3) TROCAR* itens de LISTINHA por L$ ou *4) ENVIAR* seu container.",
        section(available),
        section(presale)
    )
}

/// Balance followed by the latest ledger entries.
#[must_use]
pub fn balance_view(balance: f64, recent: &[CoinTransaction]) -> String {
    let mut lines = vec![format!("Saldo: {balance:.2} L$")];
    lines.extend(recent.iter().map(|t| {
        format!(
            "- {}: {:.2} ({})",
            t.kind,
            t.signed_value(),
            t.created_at.format("%d/%m/%Y %H:%M")
        )
    }));
    lines.join("\n")
}

/// Numbered trade candidates with their credit previews.
#[must_use]
pub fn trade_list(candidates: &[TradeCandidate]) -> String {
    if candidates.is_empty() {
        return NOTHING_TO_TRADE.to_string();
    }
    let mut lines = vec!["Itens elegíveis para *TROCA* (responda com os números, ex: 1 3):".to_string()];
    lines.extend(
        candidates
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {} → {:.2} L$", i + 1, c.name, c.credit)),
    );
    lines.join("\n")
}

/// Confirmation request quoting the preview total.
#[must_use]
pub fn trade_confirmation(chosen: &[TradeCandidate]) -> String {
    let names = chosen
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let total: f64 = chosen.iter().map(|c| c.credit).sum();
    format!(
        "Você selecionou: *{names}*.\n\
         Total de crédito: *{total:.2} L$*.\n\
         ⚠️ *Atenção*: esta ação é *irreversível*.\n\
         Confirma a conversão? (Responda *S* ou *N*)"
    )
}

/// Conversion result; names the items that could not be converted.
#[must_use]
pub fn trade_done(converted: usize, credited: f64, balance: f64, failed: &[String]) -> String {
    let mut text = format!(
        "Prontinho! Converti {converted} item(ns). Crédito: *{credited:.2} L$*.\n\
         Seu saldo agora é *{balance:.2} L$*."
    );
    if !failed.is_empty() {
        text.push_str(&format!("\nNão consegui converter: {}.", failed.join(", ")));
    }
    text
}

/// Shipment summary awaiting confirmation.
#[must_use]
pub fn shipment_summary(items: &[ContainerItem], address: Option<&str>) -> String {
    let lines = items
        .iter()
        .map(|i| format!("- {} (origem {}, {})", i.display_name(), i.origin, i.status))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Você está pedindo o *envio* do seu container com os itens:\n{lines}\n\n\
         Endereço de entrega:\n{}\n\n\
         ⚠️ *Atenção*: esta ação é *irreversível*.\n\
         Confirma o pedido? (Responda *S* ou *N*)",
        address.filter(|a| !a.trim().is_empty()).unwrap_or(NO_ADDRESS)
    )
}

/// Shipment confirmation.
#[must_use]
pub fn shipment_created(shipment: &Shipment) -> String {
    format!(
        "Pedido criado com sucesso! 📨\nID: *{}* • Status: *{}*",
        shipment.id, shipment.status
    )
}

/// Caption of a forwarded receipt.
#[must_use]
pub fn receipt_caption(transaction_id: &str, from: &str) -> String {
    format!("Comprovante de pagamento — ID {transaction_id}\nDe: {from}")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::domain::{ContainerId, ItemOrigin};

    fn item(name: &str, origin: ItemOrigin, status: ItemStatus) -> ContainerItem {
        ContainerItem {
            id: Uuid::new_v4(),
            container_id: ContainerId::new("c"),
            game_id: Uuid::new_v4(),
            game_name: Some(name.to_string()),
            origin,
            status,
            applied_price: 100.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn menu_lists_every_option() {
        let menu = menu();
        assert!(menu.starts_with("🤖 *Ludinho* — como posso ajudar?\n\n1) CONTAINER\n"));
        assert!(menu.contains("6) COMPROVANTE (enviar)\n0) MENU (voltar)\n\n_Você"));
    }

    #[test]
    fn container_view_splits_sections() {
        let view = container_view(&[
            item("Catan", ItemOrigin::Listinha, ItemStatus::Disponivel),
            item("Azul", ItemOrigin::Compra, ItemStatus::PreVenda),
        ]);
        assert!(view.contains("*DISPONÍVEIS*\n1. Catan (Listinha, DISPONIVEL)"));
        assert!(view.contains("*PRÉ-VENDA*\n2. Azul (Compra, PRE-VENDA)"));
    }

    #[test]
    fn empty_container_shows_dashes() {
        let view = container_view(&[]);
        assert!(view.contains("*DISPONÍVEIS*\n—\n\n*PRÉ-VENDA*\n—"));
    }

    #[test]
    fn trade_texts() {
        let candidates = vec![
            TradeCandidate {
                item_id: Uuid::new_v4(),
                name: "Catan".to_string(),
                credit: 85.0,
            },
            TradeCandidate {
                item_id: Uuid::new_v4(),
                name: "Azul".to_string(),
                credit: 42.5,
            },
        ];
        assert!(trade_list(&candidates).ends_with("1. Catan → 85.00 L$\n2. Azul → 42.50 L$"));
        let confirm = trade_confirmation(&candidates);
        assert!(confirm.starts_with("Você selecionou: *Catan, Azul*.\nTotal de crédito: *127.50 L$*."));
    }

    #[test]
    fn trade_done_names_failures() {
        let done = trade_done(1, 85.0, 85.0, &["Azul".to_string()]);
        assert!(done.starts_with("Prontinho! Converti 1 item(ns). Crédito: *85.00 L$*."));
        assert!(done.ends_with("Não consegui converter: Azul."));
    }

    #[test]
    fn summary_defaults_address() {
        let summary = shipment_summary(
            &[item("Catan", ItemOrigin::Compra, ItemStatus::Disponivel)],
            None,
        );
        assert!(summary.contains("- Catan (origem COMPRA, DISPONIVEL)"));
        assert!(summary.contains(NO_ADDRESS));
    }

    #[test]
    fn caption_format() {
        assert_eq!(
            receipt_caption("TX1", "5511"),
            "Comprovante de pagamento — ID TX1\nDe: 5511"
        );
    }
}
