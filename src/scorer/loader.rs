use crate::error::{PermForgeError, PfResult};
use crate::scorer::BeforeCost;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Reads a pairwise cost matrix.
///
/// `.json` files hold a dense `[[f64]]`. Anything else is CSV with a header
/// and `before,after,cost` rows over original indices; missing pairs are
/// `0`. `size` fixes `n`, otherwise it is one past the largest index seen.
pub fn load_cost_matrix<P: AsRef<Path>>(path: P, size: Option<usize>) -> PfResult<BeforeCost> {
    let path = path.as_ref();
    info!("📂 Loading Costs from: {}", path.display());

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let cost = if is_json {
        let rows: Vec<Vec<f64>> = serde_json::from_reader(File::open(path)?)?;
        BeforeCost::from_rows(rows)?
    } else {
        read_triples(File::open(path)?, size)?
    };

    if let Some(n) = size {
        if cost.len() != n {
            return Err(PermForgeError::SizeMismatch {
                what: "cost matrix",
                got: cost.len(),
                expected: n,
            });
        }
    }
    debug!("   -> {} x {} cost matrix", cost.len(), cost.len());
    Ok(cost)
}

/// CSV body of [`load_cost_matrix`].
pub fn read_triples<R: std::io::Read>(reader: R, size: Option<usize>) -> PfResult<BeforeCost> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    let mut skipped = 0;
    for (row, result) in rdr.records().enumerate() {
        let rec = result?;
        if rec.len() < 3 {
            skipped += 1;
            continue;
        }
        let (Ok(before), Ok(after), Ok(cost)) = (
            rec[0].parse::<usize>(),
            rec[1].parse::<usize>(),
            rec[2].parse::<f64>(),
        ) else {
            skipped += 1;
            continue;
        };
        if !cost.is_finite() {
            return Err(PermForgeError::Validation(format!(
                "Row {}: non-finite cost {} for ({}, {})",
                row + 1,
                cost,
                before,
                after
            )));
        }
        if before == after {
            warn!("Row {}: ignoring self pair ({}, {})", row + 1, before, after);
            continue;
        }
        entries.push((before, after, cost));
    }
    if skipped > 0 {
        warn!("⚠️  Skipped {} invalid rows in cost matrix.", skipped);
    }

    let seen = entries
        .iter()
        .map(|&(a, b, _)| a.max(b) + 1)
        .max()
        .unwrap_or(0);
    let n = size.unwrap_or(seen);
    if seen > n {
        return Err(PermForgeError::Validation(format!(
            "Index {} out of range for {} items",
            seen - 1,
            n
        )));
    }

    let mut cost = BeforeCost::new(n);
    for (a, b, c) in entries {
        cost.set(a, b, c);
    }
    Ok(cost)
}

/// Parses `"2,0,1"` (commas or whitespace) into an index sequence.
pub fn parse_order(s: &str) -> PfResult<Vec<usize>> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<usize>()
                .map_err(|_| PermForgeError::Validation(format!("'{}' is not an index", t)))
        })
        .collect()
}
