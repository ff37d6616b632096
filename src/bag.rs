//! Sparse bag-of-words documents and the line-oriented corpus format.
//!
//! A corpus file holds one document per line, each a whitespace-separated
//! list of `index:count` pairs with one-based word indices. A labels file
//! holds one `0` or `1` per line for the observed prefix of the corpus.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::label::Label;

/// Read access to the nonzero `(word index, count)` entries of a document.
///
/// The sampler only ever walks these entries, so any sparse container can
/// stand in for a [`Bag`].
pub trait SparseCounts {
    fn counts(&self) -> impl Iterator<Item = (usize, usize)> + '_;

    /// Total number of word occurrences.
    fn total(&self) -> usize {
        self.counts().map(|(_, c)| c).sum()
    }
}

/// Immutable sparse document. Entries are sorted by word index, indices are
/// unique and counts are positive.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Bag {
    entries: Vec<(usize, usize)>,
}

impl Bag {
    pub fn new() -> Bag {
        Bag::default()
    }

    /// Builds a bag from possibly repeated `(index, count)` pairs; repeated
    /// indices are summed and zero counts dropped.
    pub fn from_counts<I>(iter: I) -> Bag
        where I: IntoIterator<Item = (usize, usize)>
    {
        let mut merged: BTreeMap<usize, usize> = BTreeMap::new();
        for (v, c) in iter {
            *merged.entry(v).or_insert(0) += c;
        }
        Bag {
            entries: merged.into_iter().filter(|&(_, c)| c > 0).collect(),
        }
    }

    /// Builds a bag from a sequence of word occurrences.
    pub fn from_words<I>(words: I) -> Bag
        where I: IntoIterator<Item = usize>
    {
        Bag::from_counts(words.into_iter().map(|v| (v, 1)))
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, index: usize) -> usize {
        match self.entries.binary_search_by_key(&index, |&(v, _)| v) {
            Ok(pos) => self.entries[pos].1,
            Err(_) => 0,
        }
    }

    pub fn max_index(&self) -> Option<usize> {
        self.entries.last().map(|&(v, _)| v)
    }
}

impl FromIterator<(usize, usize)> for Bag {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Bag {
        Bag::from_counts(iter)
    }
}

impl SparseCounts for Bag {
    fn counts(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.entries.iter().cloned()
    }
}

impl SparseCounts for HashMap<usize, usize> {
    fn counts(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.iter().map(|(&v, &c)| (v, c)).filter(|&(_, c)| c > 0)
    }
}

impl SparseCounts for BTreeMap<usize, usize> {
    fn counts(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.iter().map(|(&v, &c)| (v, c)).filter(|&(_, c)| c > 0)
    }
}

fn parse_pair(elm: &str, line: usize) -> Result<(usize, usize)> {
    let mut iter = elm.split(':');
    let (index, value) = match (iter.next(), iter.next(), iter.next()) {
        (Some(i), Some(c), None) => (i, c),
        _ => return Err(Error::Parse { line, reason: format!("expected `index:count`, got `{}`", elm) }),
    };
    let index = index.parse::<usize>().map_err(|e| Error::Parse { line, reason: format!("bad index `{}`: {}", index, e) })?;
    let value = value.parse::<usize>().map_err(|e| Error::Parse { line, reason: format!("bad count `{}`: {}", value, e) })?;
    if index == 0 {
        return Err(Error::Parse { line, reason: "word indices are one-based".to_string() });
    }
    Ok((index - 1, value))
}

/// Reads bags from `reader`, returning them with the vocabulary size implied
/// by the largest index seen. An empty line is an empty document.
pub fn read_bags<R: BufRead>(reader: R) -> Result<(Vec<Bag>, usize)> {
    let mut bags = Vec::new();
    let mut vocab_size = 0;
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let mut pairs = Vec::new();
        for elm in line.split_whitespace() {
            let (v, c) = parse_pair(elm, n + 1)?;
            if vocab_size < v + 1 {
                vocab_size = v + 1;
            }
            pairs.push((v, c));
        }
        bags.push(Bag::from_counts(pairs));
    }
    Ok((bags, vocab_size))
}

pub fn load_bags<P: AsRef<Path>>(path: P) -> Result<(Vec<Bag>, usize)> {
    let file = File::open(path)?;
    read_bags(BufReader::new(file))
}

/// Reads one label per line; blank lines are skipped.
pub fn read_labels<R: BufRead>(reader: R) -> Result<Vec<Label>> {
    let mut labels = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        let label = token.parse::<u8>()
            .map_err(|e| e.to_string())
            .and_then(|v| Label::try_from(v).map_err(|e| e.to_string()))
            .map_err(|reason| Error::Parse { line: n + 1, reason })?;
        labels.push(label);
    }
    Ok(labels)
}

pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<Label>> {
    let file = File::open(path)?;
    read_labels(BufReader::new(file))
}

/// Remaps the word ids used in `bags` onto `0..n`. The order relation of any
/// pair of ids is preserved. Returns the remapped bags, `n`, and the map from
/// new ids back to the original ones.
pub fn compact_words(bags: Vec<Bag>) -> (Vec<Bag>, usize, HashMap<usize, usize>) {
    let mut ids: Vec<usize> = bags.iter().flat_map(|bag| bag.counts().map(|(v, _)| v)).collect();
    ids.sort_unstable();
    ids.dedup();
    let id_map: HashMap<usize, usize> = ids.iter().cloned().zip(0..).collect();
    let rev_id_map: HashMap<usize, usize> = ids.into_iter().enumerate().collect();
    let bags = bags.into_iter()
        .map(|bag| bag.counts().map(|(v, c)| (id_map[&v], c)).collect::<Bag>())
        .collect();
    (bags, rev_id_map.len(), rev_id_map)
}
