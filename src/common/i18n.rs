// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::LazyLock;

pub const DEFAULT_LANG: &str = "pt";

const PT: &[(&str, &str)] = &[
    ("validation_failed", "Um ou mais campos são inválidos."),
    ("invalid_input", "O campo '{field}' é inválido ({reason})."),
    ("slot_conflict", "Já existe um agendamento neste horário."),
    ("insufficient_stock", "Estoque insuficiente. Apenas {available} unidades disponíveis."),
    ("monthly_limit_reached", "O plano atual permite {limit} agendamentos por mês."),
    ("invalid_status_transition", "Não é possível mudar o status de '{from}' para '{to}'."),
    ("sale_already_voided", "Esta venda já foi estornada."),
    ("still_referenced", "Não é possível excluir: {entity} possui registros vinculados."),
    ("not_found", "Registro não encontrado ({entity})."),
    ("invalid_token", "Token de autenticação inválido ou ausente."),
    ("forbidden", "Você não tem acesso a este estabelecimento."),
    ("missing_tenant", "O cabeçalho X-Tenant-ID é obrigatório e deve ser um UUID."),
    ("constraint_violation", "Os dados violam uma regra de integridade e não foram gravados."),
    ("store_unavailable", "Serviço temporariamente indisponível. Tente novamente."),
    ("store_timeout", "A operação demorou demais. Tente novamente."),
    ("internal_error", "Ocorreu um erro inesperado."),
];

const EN: &[(&str, &str)] = &[
    ("validation_failed", "One or more fields are invalid."),
    ("invalid_input", "Field '{field}' is invalid ({reason})."),
    ("slot_conflict", "There is already an appointment at this time."),
    ("insufficient_stock", "Insufficient stock. Only {available} units available."),
    ("monthly_limit_reached", "The current plan allows {limit} appointments per month."),
    ("invalid_status_transition", "Cannot change status from '{from}' to '{to}'."),
    ("sale_already_voided", "This sale has already been voided."),
    ("still_referenced", "Cannot delete: {entity} still has linked records."),
    ("not_found", "Record not found ({entity})."),
    ("invalid_token", "Invalid or missing authentication token."),
    ("forbidden", "You do not have access to this business."),
    ("missing_tenant", "The X-Tenant-ID header is required and must be a UUID."),
    ("constraint_violation", "The data breaks an integrity rule and was not saved."),
    ("store_unavailable", "Service temporarily unavailable. Please retry."),
    ("store_timeout", "The operation took too long. Please retry."),
    ("internal_error", "An unexpected error occurred."),
];

static GLOBAL: LazyLock<I18nStore> = LazyLock::new(I18nStore::builtin);

// Catálogo de mensagens por idioma -> código do erro
#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn builtin() -> Self {
        let mut messages = HashMap::new();
        messages.insert("pt", PT.iter().copied().collect());
        messages.insert("en", EN.iter().copied().collect());
        Self { messages }
    }

    pub fn global() -> &'static I18nStore {
        &GLOBAL
    }

    /// Traduz `code` para `lang`, caindo para o português e por fim para o próprio código.
    pub fn translate(&self, lang: &str, code: &str, params: &[(&str, String)]) -> String {
        let template = self
            .messages
            .get(lang)
            .and_then(|m| m.get(code))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|m| m.get(code)))
            .copied()
            .unwrap_or(code);

        params.iter().fold(template.to_string(), |msg, (key, value)| {
            msg.replace(&format!("{{{}}}", key), value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_portuguese_then_code() {
        let store = I18nStore::builtin();
        assert_eq!(
            store.translate("es", "forbidden", &[]),
            "Você não tem acesso a este estabelecimento."
        );
        assert_eq!(store.translate("en", "unknown_code", &[]), "unknown_code");
    }

    #[test]
    fn fills_placeholders() {
        let store = I18nStore::builtin();
        let msg = store.translate("en", "monthly_limit_reached", &[("limit", "30".to_string())]);
        assert_eq!(msg, "The current plan allows 30 appointments per month.");
    }
}
