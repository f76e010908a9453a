//! Interface de linha de comando do zoomkit baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, list)
//! e a flag global `--verbose`.

use clap::{Parser, Subcommand};

/// zoomkit: executa suites de integração contra a API do Zoom.
#[derive(Debug, Parser)]
#[command(name = "zoomkit", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa as suites registradas e imprime o resumo.
    Run {
        /// Número máximo de suites ativas ao mesmo tempo.
        #[arg(long, short = 'c')]
        concurrency: Option<usize>,

        /// Executa apenas as suites com estes nomes (repetível).
        #[arg(long = "only", value_name = "NAME")]
        only: Vec<String>,

        /// Não espera uma tecla antes de encerrar.
        #[arg(long, default_value_t = false)]
        no_pause: bool,

        /// Imprime os resultados também em JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Lista as suites registradas, na ordem de admissão.
    List,
}
