//! Instance text formats.
//!
//! Every format is a stream of whitespace-separated integers; line
//! breaks carry no meaning. Leading counts determine how many values
//! follow:
//!
//! | Kind | Layout |
//! |------|--------|
//! | FlowShop | `n g`, then `n` rows of `g` times |
//! | DistributedFlowShop | `n g f`, then `n` rows of `g` times |
//! | HybridFlowShop | `n g`, `g` machine counts, `n` rows of `g` times |
//! | JobShop | `n g`, `n` rows of `g` times, `n` rows of 1-based machines |
//! | FlexibleJobShop | `n m`, `n` operation counts, one row of `m` times per operation (0 = ineligible) |
//! | ParallelMachine | `n m`, then `n` rows of `m` times |
//! | SetupFlowShop | `n g`, `n` rows of `g` times, then per stage `n` rows of `n` setups |

use std::path::Path;
use std::str::SplitWhitespace;

use tracing::debug;

use crate::error::ParseError;
use crate::models::{Instance, ProblemKind};

/// Integer reader over a whitespace-token stream.
struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace(),
        }
    }

    fn next_token(&mut self, context: &str) -> Result<&'a str, ParseError> {
        self.inner
            .next()
            .ok_or_else(|| ParseError::UnexpectedEnd(context.to_string()))
    }

    fn integer(&mut self, context: &str) -> Result<i64, ParseError> {
        let token = self.next_token(context)?;
        token.parse().map_err(|_| invalid(token, context))
    }

    fn count(&mut self, context: &str) -> Result<usize, ParseError> {
        let token = self.next_token(context)?;
        token.parse().map_err(|_| invalid(token, context))
    }

    /// 1-based index read as 0-based.
    fn index(&mut self, context: &str) -> Result<usize, ParseError> {
        let token = self.next_token(context)?;
        match token.parse::<usize>() {
            Ok(value) if value >= 1 => Ok(value - 1),
            _ => Err(invalid(token, context)),
        }
    }

    fn row(&mut self, len: usize, context: &str) -> Result<Vec<i64>, ParseError> {
        (0..len).map(|_| self.integer(context)).collect()
    }

    fn table(&mut self, rows: usize, cols: usize, context: &str) -> Result<Vec<Vec<i64>>, ParseError> {
        (0..rows).map(|_| self.row(cols, context)).collect()
    }

    fn finish(mut self) -> Result<(), ParseError> {
        let rest = self.inner.by_ref().count();
        if rest > 0 {
            return Err(ParseError::TrailingTokens(rest));
        }
        Ok(())
    }
}

fn invalid(token: &str, context: &str) -> ParseError {
    ParseError::InvalidInteger {
        token: token.to_string(),
        context: context.to_string(),
    }
}

/// Parses an instance of `kind` from its text format.
///
/// # Examples
///
/// ```
/// use u_formulate::io::parse_instance;
/// use u_formulate::models::ProblemKind;
///
/// let text = "2\n2\n3 2\n2 4\n";
/// let instance = parse_instance(ProblemKind::FlowShop, text).unwrap();
/// assert_eq!(instance.job_count(), 2);
/// assert_eq!(instance.horizon(), 11);
/// ```
pub fn parse_instance(kind: ProblemKind, text: &str) -> Result<Instance, ParseError> {
    let mut tokens = Tokens::new(text);
    let n = tokens.count("job count")?;

    let instance = match kind {
        ProblemKind::FlowShop => {
            let g = tokens.count("stage count")?;
            let p = tokens.table(n, g, "processing times")?;
            tokens.finish()?;
            Instance::flow_shop(p)?
        }
        ProblemKind::DistributedFlowShop => {
            let g = tokens.count("stage count")?;
            let f = tokens.count("factory count")?;
            let p = tokens.table(n, g, "processing times")?;
            tokens.finish()?;
            Instance::distributed_flow_shop(f, p)?
        }
        ProblemKind::HybridFlowShop => {
            let g = tokens.count("stage count")?;
            let machines = (0..g)
                .map(|_| tokens.count("machines per stage"))
                .collect::<Result<Vec<_>, _>>()?;
            let p = tokens.table(n, g, "processing times")?;
            tokens.finish()?;
            Instance::hybrid_flow_shop(machines, p)?
        }
        ProblemKind::JobShop => {
            let g = tokens.count("machine count")?;
            let p = tokens.table(n, g, "processing times")?;
            let routes = (0..n)
                .map(|_| (0..g).map(|_| tokens.index("job route")).collect())
                .collect::<Result<Vec<Vec<usize>>, _>>()?;
            tokens.finish()?;
            Instance::job_shop(p, routes)?
        }
        ProblemKind::FlexibleJobShop => {
            let m = tokens.count("machine count")?;
            let ops = (0..n)
                .map(|_| tokens.count("operation count"))
                .collect::<Result<Vec<_>, _>>()?;
            let p = ops
                .iter()
                .map(|&o| tokens.table(o, m, "processing times"))
                .collect::<Result<Vec<_>, _>>()?;
            tokens.finish()?;
            Instance::flexible_job_shop(m, p)?
        }
        ProblemKind::ParallelMachine => {
            let m = tokens.count("machine count")?;
            let p = tokens.table(n, m, "processing times")?;
            tokens.finish()?;
            Instance::parallel_machine(p)?
        }
        ProblemKind::SetupFlowShop => {
            let g = tokens.count("stage count")?;
            let p = tokens.table(n, g, "processing times")?;
            let setups = (0..g)
                .map(|_| tokens.table(n, n, "setup times"))
                .collect::<Result<Vec<_>, _>>()?;
            tokens.finish()?;
            Instance::setup_flow_shop(p, setups)?
        }
    };

    debug!(
        event = "instance_parsed",
        kind = kind.name(),
        jobs = instance.job_count(),
        machines = instance.machine_count(),
    );
    Ok(instance)
}

/// Reads and parses an instance file.
pub fn read_instance(kind: ProblemKind, path: impl AsRef<Path>) -> Result<Instance, ParseError> {
    let text = std::fs::read_to_string(path)?;
    parse_instance(kind, &text)
}
