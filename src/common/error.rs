use thiserror::Error;
use uuid::Uuid;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
//
// Conflitos de agenda e fechamentos parciais NÃO são erros: eles voltam
// como dados estruturados (`ValidationResult`, `AgencySettlementView`).
// Aqui só entram falhas reais da operação em andamento.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Pacote {0} não encontrado")]
    PackageNotFound(Uuid),

    // Variante para erros de banco de dados. Uma falha de acesso ao
    // store aborta a operação inteira: nunca viramos "sem conflito" ou
    // "receita zero" por causa de uma consulta que falhou.
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Indica se vale a pena a camada chamadora repetir a operação.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::DatabaseError(_) | AppError::InternalError(_))
    }
}
