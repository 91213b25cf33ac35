use anyhow::{Context, Result, bail};
use std::collections::HashSet;

pub const DEFAULT_SEED: u64 = 1337;
const MAX_RANGE_SEEDS: u64 = 10_000;

/// Seed plus the CLI token it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: u64,
    pub token: String,
}

impl SeedInfo {
    #[must_use]
    pub fn new(seed: u64, token: impl Into<String>) -> Self {
        Self {
            seed,
            token: token.into(),
        }
    }
}

fn parse_seed(token: &str) -> Option<u64> {
    if let Ok(value) = token.parse::<i64>() {
        return Some(value.unsigned_abs());
    }
    if let Ok(value) = token.parse::<u64>() {
        return Some(value);
    }
    let hex = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))?;
    u64::from_str_radix(hex, 16).ok()
}

fn parse_range(token: &str) -> Result<Option<Vec<u64>>> {
    let Some((start, end)) = token.split_once("..") else {
        return Ok(None);
    };
    let start = parse_seed(start).with_context(|| format!("bad range start in {token}"))?;
    let end = parse_seed(end).with_context(|| format!("bad range end in {token}"))?;
    if end < start {
        bail!("Seed range {token} runs backwards");
    }
    if end - start > MAX_RANGE_SEEDS {
        bail!("Seed range {token} spans more than {MAX_RANGE_SEEDS} seeds");
    }
    Ok(Some((start..end).collect()))
}

/// Resolve a list of CLI seed arguments into canonical seeds.
///
/// Accepts decimal integers (negative values use their magnitude), `0x` hex,
/// and half-open ranges like `10..20`. Duplicates keep their first position.
///
/// # Errors
///
/// Returns an error for any token that is not a seed or a valid range.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut pending = Vec::new();

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Some(range) = parse_range(token)? {
            pending.extend(range.into_iter().map(|seed| SeedInfo::new(seed, token)));
            continue;
        }
        match parse_seed(token) {
            Some(seed) => pending.push(SeedInfo::new(seed, token)),
            None => bail!("Unrecognized seed token: {token}"),
        }
    }

    let mut seen = HashSet::new();
    let mut deduped: Vec<SeedInfo> = pending
        .into_iter()
        .filter(|info| seen.insert(info.seed))
        .collect();

    if deduped.is_empty() {
        deduped.push(SeedInfo::new(DEFAULT_SEED, DEFAULT_SEED.to_string()));
    }

    Ok(deduped)
}
