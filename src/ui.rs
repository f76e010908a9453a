//! Interface de terminal do zoomkit: spinner e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner de progresso e `console` para
//! estilização com cores. O [`RunProgress`] conta as suites concluídas e
//! imprime os blocos de log sem que eles se misturem com a animação.

use std::io::{self, Write};
use std::time::Duration;

use console::{Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use zoomkit::harness::{ConsoleSink, Outcome, ResultCode};

/// Indicador visual de progresso para uma execução.
///
/// Cada bloco de log recebido corresponde a uma suite encerrada.
/// Clones compartilham o mesmo spinner.
#[derive(Clone)]
pub struct RunProgress {
    pb: ProgressBar,
}

impl RunProgress {
    /// Inicia o spinner para `total` suites.
    pub fn start(total: usize) -> Self {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} [{pos}/{len}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Running suites");
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    /// Spinner invisível, para saída redirecionada e testes.
    pub fn hidden(total: usize) -> Self {
        let pb = ProgressBar::hidden();
        pb.set_length(total as u64);
        Self { pb }
    }

    pub fn finished(&self) -> u64 {
        self.pb.position()
    }

    /// Remove o spinner do terminal.
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl ConsoleSink for RunProgress {
    fn write_block(&mut self, block: &str) -> io::Result<()> {
        let result = self.pb.suspend(|| {
            let mut out = io::stdout().lock();
            writeln!(out, "{block}")?;
            out.flush()
        });
        self.pb.inc(1);
        result
    }
}

/// Imprime o resumo final com o estilo do resultado geral.
pub fn print_summary(text: &str, code: ResultCode) {
    let banner = Style::new().cyan();
    let status = match code {
        ResultCode::Success => Style::new().green().bold(),
        ResultCode::Failure => Style::new().red().bold(),
        ResultCode::Cancelled => Style::new().yellow().bold(),
    };

    let lines: Vec<&str> = text.lines().collect();
    let last = lines.len().saturating_sub(1);
    for (i, line) in lines.iter().enumerate() {
        if line.starts_with('*') {
            println!("{}", banner.apply_to(line));
        } else if i == last {
            println!("{} ({code})", status.apply_to(line));
        } else {
            println!("{line}");
        }
    }
}

/// Imprime os resultados em JSON.
pub fn print_json(outcomes: &[Outcome]) {
    match serde_json::to_string_pretty(outcomes) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "failed to encode outcomes"),
    }
}

/// Aguarda uma tecla do operador. Não faz nada fora de um terminal.
pub fn wait_for_key() {
    let term = Term::stdout();
    if !term.is_term() {
        return;
    }
    let _ = term.write_line("Press any key to exit");
    let _ = term.read_key();
}
