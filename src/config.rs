//! Configuração do zoomkit carregada a partir de `zoomkit.toml`.
//!
//! A struct [`ZoomkitConfig`] contém todos os parâmetros do harness.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `ZOOMKIT_CONCURRENCY` tem precedência sobre o arquivo.
//! As credenciais nunca vêm deste arquivo: veja [`crate::auth::Credentials::from_env`].

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::client::RetryConfig;

const CONFIG_FILE: &str = "zoomkit.toml";

/// Configuração de nível superior carregada de `zoomkit.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoomkitConfig {
    /// Número máximo de suites executando ao mesmo tempo.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Largura da coluna de nomes no resumo final.
    #[serde(default = "default_name_width")]
    pub name_width: usize,

    /// URL base da API REST.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// URL base do servidor OAuth (`/oauth/token`).
    #[serde(default = "default_oauth_base_url")]
    pub oauth_base_url: String,

    /// Máximo de retentativas após HTTP 429.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Atraso base em milissegundos para backoff exponencial.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Arquivo onde tokens rotacionados são persistidos. Desligado quando ausente.
    #[serde(default)]
    pub token_store: Option<PathBuf>,

    /// Aguarda uma tecla antes de encerrar o processo.
    #[serde(default = "default_pause_on_exit")]
    pub pause_on_exit: bool,
}

fn default_concurrency_limit() -> usize {
    5
}

fn default_name_width() -> usize {
    25
}

fn default_api_base_url() -> String {
    "https://api.zoom.us/v2".to_string()
}

fn default_oauth_base_url() -> String {
    "https://zoom.us".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_pause_on_exit() -> bool {
    true
}

impl Default for ZoomkitConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            name_width: default_name_width(),
            api_base_url: default_api_base_url(),
            oauth_base_url: default_oauth_base_url(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            token_store: None,
            pause_on_exit: default_pause_on_exit(),
        }
    }
}

impl ZoomkitConfig {
    /// Carrega a configuração de `zoomkit.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Path::new(CONFIG_FILE))?;

        if let Ok(raw) = std::env::var("ZOOMKIT_CONCURRENCY")
            && !raw.is_empty()
        {
            config.concurrency_limit = raw
                .parse()
                .with_context(|| format!("ZOOMKIT_CONCURRENCY is not a number: {raw}"))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Lê um arquivo específico; caminho inexistente resulta nos defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str::<ZoomkitConfig>(&contents)?;
        Ok(config)
    }

    /// Rejeita valores que tornariam a execução impossível.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            bail!("concurrency_limit must be at least 1");
        }
        // Espaço para ao menos um caractere seguido de "..."
        if self.name_width < 4 {
            bail!("name_width must be at least 4");
        }
        Ok(())
    }

    /// Política de retentativa para o cliente HTTP.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
        }
    }
}
