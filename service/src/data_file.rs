//! Atom-type remapping for LAMMPS data files.
//!
//! A data file built for one repeat sequence (say `(CAG)40 x 64`) can be
//! turned into another one of the same chain length by rewriting the type
//! column of the `Atoms` section, nucleotide by nucleotide along each chain.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DataFileError {
    #[error("Could not find '<N> atoms' line in header")]
    MissingAtomCount,

    #[error("Could not find 'Atoms' section in data file")]
    MissingAtomsSection,

    #[error("Atoms block (expected {expected} lines) extends past EOF (start={start}, end={end}, total_lines={total})")]
    TruncatedAtoms {
        expected: usize,
        start: usize,
        end: usize,
        total: usize,
    },

    #[error("No atom entries found in Atoms block")]
    NoAtoms,

    #[error("Total atoms ({atoms}) is not divisible by number of chains ({chains})")]
    UnevenChains { atoms: usize, chains: usize },

    #[error("Unexpected atom line format at line {line}: {content:?}")]
    MalformedAtom { line: usize, content: String },

    #[error("Invalid sequence pattern '{0}', expected letters from A, C, G, U")]
    InvalidPattern(String),
}

/// A repeat unit of nucleotides, stored as atom types: A=1, C=2, G=3, U=4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern(Vec<u32>);

impl Pattern {
    fn type_at(&self, idx: usize) -> u32 {
        self.0[idx % self.0.len()]
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self(vec![1, 2, 1, 3])
    }
}

impl FromStr for Pattern {
    type Err = DataFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let types = s
            .trim()
            .chars()
            .map(|c| match c.to_ascii_uppercase() {
                'A' => Ok(1),
                'C' => Ok(2),
                'G' => Ok(3),
                'U' => Ok(4),
                _ => Err(DataFileError::InvalidPattern(s.to_owned())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if types.is_empty() {
            return Err(DataFileError::InvalidPattern(s.to_owned()));
        }
        Ok(Self(types))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in &self.0 {
            let c = match t {
                1 => 'A',
                2 => 'C',
                3 => 'G',
                _ => 'U',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapReport {
    pub atoms: usize,
    pub chains: usize,
    pub chain_len: usize,
}

impl fmt::Display for RemapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} atoms, {} chains, {} nucleotides per chain",
            self.atoms, self.chains, self.chain_len
        )
    }
}

/// Rewrites the type column of every atom so that position `i` of each chain
/// gets `pattern[i % pattern.len()]`. Lines outside the `Atoms` block are
/// returned untouched.
pub fn remap(data: &str, pattern: &Pattern) -> Result<(String, RemapReport), DataFileError> {
    let mut lines: Vec<String> = data.split_inclusive('\n').map(str::to_owned).collect();

    let atoms = atom_count(&lines)?;
    let (start, end) = atoms_block(&lines, atoms)?;
    let (chain_len, chains) = chain_shape(&lines[start..end])?;

    for (i, line) in lines.iter_mut().enumerate().take(end).skip(start) {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        let malformed = || DataFileError::MalformedAtom {
            line: i + 1,
            content: line.clone(),
        };
        let mut parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 {
            return Err(malformed());
        }
        let atom_id: usize = parts[0].parse().map_err(|_| malformed())?;
        let idx_in_chain = atom_id.checked_sub(1).ok_or_else(malformed)? % chain_len;
        let new_type = pattern.type_at(idx_in_chain).to_string();
        parts[2] = &new_type;
        let rewritten = parts.join(" ") + "\n";
        *line = rewritten;
    }

    Ok((
        lines.concat(),
        RemapReport {
            atoms,
            chains,
            chain_len,
        },
    ))
}

fn atom_count(lines: &[String]) -> Result<usize, DataFileError> {
    lines
        .iter()
        .find_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                [n, "atoms"] => n.parse().ok(),
                _ => None,
            }
        })
        .ok_or(DataFileError::MissingAtomCount)
}

/// Line range of the atom entries: the section header is followed by one blank line.
fn atoms_block(lines: &[String], atoms: usize) -> Result<(usize, usize), DataFileError> {
    let header = lines
        .iter()
        .position(|line| line.trim().starts_with("Atoms"))
        .ok_or(DataFileError::MissingAtomsSection)?;
    let start = header + 2;
    let end = start + atoms;
    if end > lines.len() {
        return Err(DataFileError::TruncatedAtoms {
            expected: atoms,
            start,
            end,
            total: lines.len(),
        });
    }
    Ok((start, end))
}

/// Chain count is the highest molecule id; every chain has the same length.
fn chain_shape(block: &[String]) -> Result<(usize, usize), DataFileError> {
    let chains = block
        .iter()
        .filter(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            (parts.len() >= 3).then(|| parts[1].parse::<usize>().ok())
        })
        .flatten()
        .max()
        .filter(|&chains| chains > 0)
        .ok_or(DataFileError::NoAtoms)?;

    if block.len() % chains != 0 {
        return Err(DataFileError::UnevenChains {
            atoms: block.len(),
            chains,
        });
    }
    Ok((block.len() / chains, chains))
}
