//! Card selection grammar for card-domain attributes.
//!
//! A selector picks cards out of the player's piles:
//!
//! ```text
//! selector := term ('+' term)*
//! term     := [domain '.'] kind
//! domain   := hand | draw | discard | exhaust
//! kind     := random[N] | leftmost[N] | rightmost[N] | choose[N]
//!           | all | all_cards | current[...]
//! ```
//!
//! Terms without a domain use the attribute's default pile. Cards picked by
//! several terms are only selected once.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::card::Card;
use super::pile::{Pile, Piles};
use crate::core::rng::GameRng;

/// How a single selector term picks cards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorKind {
    /// N distinct random cards.
    Random(usize),
    /// First N cards.
    Leftmost(usize),
    /// Last N cards.
    Rightmost(usize),
    /// Every card in the domain pile.
    All,
    /// Every card in hand, draw and discard piles.
    AllCards,
    /// N cards picked by the host (UI choice).
    Choose(usize),
    /// The card currently being played.
    Current,
}

/// One `[domain.]kind` term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorTerm {
    pub domain: Option<Pile>,
    pub kind: SelectorKind,
}

/// A `+`-joined list of selector terms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSelector {
    pub terms: SmallVec<[SelectorTerm; 2]>,
}

const KEYWORDS: [&str; 7] = [
    "all_cards",
    "all",
    "random",
    "leftmost",
    "rightmost",
    "choose",
    "current",
];

/// Does `text` begin with something a selector term could start with?
#[must_use]
pub fn starts_selector(text: &str) -> bool {
    let body = strip_domain(text).map_or(text, |(_, rest)| rest);
    KEYWORDS.iter().any(|kw| keyword_at(body, kw))
}

fn strip_domain(text: &str) -> Option<(Pile, &str)> {
    let (head, rest) = text.split_once('.')?;
    Pile::from_domain(head).map(|pile| (pile, rest))
}

fn keyword_at(text: &str, keyword: &str) -> bool {
    text.starts_with(keyword)
        && !text[keyword.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse the bracketed count after a keyword. A missing bracket means 1.
fn parse_count<'a>(text: &'a str, raw: &str) -> Result<(usize, &'a str), String> {
    let Some(inner) = text.strip_prefix('[') else {
        return Ok((1, text));
    };
    let close = inner
        .find(']')
        .ok_or_else(|| format!("unclosed '[' in selector '{raw}'"))?;
    let count = inner[..close]
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("selector count '{}' is not a number", &inner[..close]))?;
    Ok((count, &inner[close + 1..]))
}

impl CardSelector {
    /// Parse a selector from the start of `text`.
    ///
    /// Returns the selector and the unconsumed remainder (typically an
    /// operator and value, e.g. `-1` in `hand.all-1`).
    pub fn parse_prefix(text: &str) -> Result<(Self, &str), String> {
        let mut terms = SmallVec::new();
        let mut rest = text;

        loop {
            let (domain, body) = match strip_domain(rest) {
                Some((pile, body)) => (Some(pile), body),
                None => (None, rest),
            };

            let keyword = KEYWORDS
                .iter()
                .find(|kw| keyword_at(body, kw))
                .ok_or_else(|| format!("unknown card selector '{text}'"))?;
            let after = &body[keyword.len()..];

            let (kind, after) = match *keyword {
                "all_cards" => (SelectorKind::AllCards, after),
                "all" => (SelectorKind::All, after),
                "current" => {
                    // Bracket content is accepted for compatibility and ignored.
                    let after = match after.strip_prefix('[') {
                        Some(inner) => {
                            let close = inner
                                .find(']')
                                .ok_or_else(|| format!("unclosed '[' in selector '{text}'"))?;
                            &inner[close + 1..]
                        }
                        None => after,
                    };
                    (SelectorKind::Current, after)
                }
                kw => {
                    let (count, after) = parse_count(after, text)?;
                    let kind = match kw {
                        "random" => SelectorKind::Random(count),
                        "leftmost" => SelectorKind::Leftmost(count),
                        "rightmost" => SelectorKind::Rightmost(count),
                        _ => SelectorKind::Choose(count),
                    };
                    (kind, after)
                }
            };

            terms.push(SelectorTerm { domain, kind });
            rest = after;

            match rest.strip_prefix('+') {
                Some(next) if starts_selector(next) => rest = next,
                _ => break,
            }
        }

        Ok((Self { terms }, rest))
    }

    /// Parse a complete selector; trailing text is an error.
    pub fn parse(text: &str) -> Result<Self, String> {
        let (selector, rest) = Self::parse_prefix(text.trim())?;
        if rest.trim().is_empty() {
            Ok(selector)
        } else {
            Err(format!("unexpected '{rest}' after selector"))
        }
    }

    /// A single `domain.random[N]` selector.
    #[must_use]
    pub fn random(domain: Pile, count: usize) -> Self {
        Self {
            terms: smallvec::smallvec![SelectorTerm {
                domain: Some(domain),
                kind: SelectorKind::Random(count),
            }],
        }
    }
}

/// Host-side choice of cards for `choose[N]` selectors.
pub trait CardChooser {
    /// Pick up to `count` uids out of `cards`.
    fn choose(&mut self, pile: Pile, cards: &[Card], count: usize) -> Vec<u32>;
}

/// Fallback chooser: takes the leftmost cards.
#[derive(Clone, Copy, Debug, Default)]
pub struct LeftmostChooser;

impl CardChooser for LeftmostChooser {
    fn choose(&mut self, _pile: Pile, cards: &[Card], count: usize) -> Vec<u32> {
        cards.iter().take(count).map(|c| c.uid).collect()
    }
}

/// Everything needed to turn a selector into concrete card uids.
pub struct SelectionInput<'a> {
    pub piles: &'a Piles,
    pub default_domain: Pile,
    pub current: Option<u32>,
    pub rng: &'a mut GameRng,
    pub chooser: &'a mut dyn CardChooser,
}

/// Resolve a selector to card uids, in selection order, without duplicates.
pub fn select_cards(selector: &CardSelector, input: SelectionInput<'_>) -> Vec<u32> {
    let SelectionInput {
        piles,
        default_domain,
        current,
        rng,
        chooser,
    } = input;
    let mut picked: Vec<u32> = Vec::new();

    for term in &selector.terms {
        let domain = term.domain.unwrap_or(default_domain);
        let cards = piles.get(domain);
        let uids: Vec<u32> = match term.kind {
            SelectorKind::Random(n) => rng
                .sample_indices(cards.len(), n)
                .into_iter()
                .map(|i| cards[i].uid)
                .collect(),
            SelectorKind::Leftmost(n) => cards.iter().take(n).map(|c| c.uid).collect(),
            SelectorKind::Rightmost(n) => {
                let skip = cards.len().saturating_sub(n);
                cards.iter().skip(skip).map(|c| c.uid).collect()
            }
            SelectorKind::All => cards.iter().map(|c| c.uid).collect(),
            SelectorKind::AllCards => [Pile::Hand, Pile::Draw, Pile::Discard]
                .into_iter()
                .flat_map(|p| piles.get(p).iter().map(|c| c.uid))
                .collect(),
            SelectorKind::Choose(n) => chooser.choose(domain, cards, n),
            SelectorKind::Current => current
                .filter(|uid| piles.find(*uid).is_some())
                .into_iter()
                .collect(),
        };

        for uid in uids {
            if !picked.contains(&uid) {
                picked.push(uid);
            }
        }
    }

    picked
}
