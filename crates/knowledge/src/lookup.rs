//! Keyword lookup over stored questions.

use std::fmt;

use crate::{Entry, KnowledgeBase, Result};

/// Words that carry no meaning for matching.
pub const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "any", "are", "as", "at", "be", "but", "by", "can", "could", "did",
    "do", "does", "for", "from", "had", "has", "have", "how", "i", "if", "in", "is", "it", "its",
    "me", "my", "of", "on", "or", "our", "please", "should", "so", "tell", "than", "that", "the",
    "their", "there", "these", "they", "this", "those", "to", "was", "we", "were", "what", "when",
    "where", "which", "who", "whom", "why", "will", "with", "would", "you", "your",
];

/// Tokens shorter than this are ignored.
pub const MIN_KEYWORD_LEN: usize = 3;

/// Maximum number of ranked matches returned.
pub const MAX_MATCHES: usize = 3;

/// Reduce free text to its significant lowercase words.
///
/// Punctuation is stripped, stopwords and short tokens dropped. Keywords
/// keep their first-occurrence order and appear once.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    let mut keywords: Vec<String> = Vec::new();
    for token in cleaned.split_whitespace() {
        if token.chars().count() < MIN_KEYWORD_LEN || STOPWORDS.contains(&token) {
            continue;
        }
        if !keywords.iter().any(|k| k == token) {
            keywords.push(token.to_string());
        }
    }
    keywords
}

/// Fraction of `keywords` that occur in `question`, ignoring case.
pub fn match_score<S: AsRef<str>>(keywords: &[S], question: &str) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let question = question.to_lowercase();
    let hits = keywords
        .iter()
        .filter(|k| question.contains(&k.as_ref().to_lowercase()))
        .count();
    hits as f64 / keywords.len() as f64
}

/// A scored entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub entry: Entry,
    pub score: f64,
}

impl Match {
    /// Score as a whole percentage.
    pub fn relevance(&self) -> u32 {
        (self.score * 100.0).round() as u32
    }
}

/// Outcome of [`KnowledgeBase::smart_query`].
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Entries ranked by keyword overlap, best first.
    Ranked {
        keywords: Vec<String>,
        matches: Vec<Match>,
    },
    /// Nothing scored; entries containing the first keyword instead.
    Fallback { keyword: String, entries: Vec<Entry> },
    /// Nothing found at all.
    NoMatch { keywords: Vec<String> },
}

impl KnowledgeBase {
    /// Find the stored questions that best match a free-text query.
    pub fn smart_query(&self, query: &str) -> Result<Lookup> {
        let keywords = extract_keywords(query);
        if keywords.is_empty() {
            return Ok(Lookup::NoMatch { keywords });
        }

        let mut matches: Vec<Match> = self
            .entries()?
            .into_iter()
            .filter_map(|entry| {
                let score = match_score(keywords.as_slice(), &entry.question);
                (score > 0.0).then_some(Match { entry, score })
            })
            .collect();

        if !matches.is_empty() {
            matches.sort_by(|a, b| b.score.total_cmp(&a.score));
            matches.truncate(MAX_MATCHES);
            return Ok(Lookup::Ranked { keywords, matches });
        }

        // Ranking folds case at least as widely as SQLite's lower(), so this finds nothing new today.
        let keyword = keywords[0].clone();
        let entries = self.search_questions(&keyword, MAX_MATCHES)?;
        if entries.is_empty() {
            Ok(Lookup::NoMatch { keywords })
        } else {
            Ok(Lookup::Fallback { keyword, entries })
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Ranked { keywords, matches } => {
                writeln!(
                    f,
                    "Found {} relevant result(s) for keywords: {}",
                    matches.len(),
                    keywords.join(", ")
                )?;
                for (i, m) in matches.iter().enumerate() {
                    writeln!(f)?;
                    writeln!(f, "{}. Q: {}", i + 1, m.entry.question)?;
                    writeln!(f, "   A: {}", m.entry.answer)?;
                    write!(f, "   Relevance: {}%", m.relevance())?;
                    if i + 1 < matches.len() {
                        writeln!(f)?;
                    }
                }
                Ok(())
            }
            Lookup::Fallback { keyword, entries } => {
                writeln!(f, "Partial matches for \"{keyword}\":")?;
                for (i, entry) in entries.iter().enumerate() {
                    writeln!(f)?;
                    writeln!(f, "{}. Q: {}", i + 1, entry.question)?;
                    write!(f, "   A: {}", entry.answer)?;
                    if i + 1 < entries.len() {
                        writeln!(f)?;
                    }
                }
                Ok(())
            }
            Lookup::NoMatch { keywords } if keywords.is_empty() => {
                write!(f, "No searchable keywords in the query.")
            }
            Lookup::NoMatch { keywords } => write!(
                f,
                "No matching information found for keywords: {}",
                keywords.join(", ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kb(pairs: &[(&str, &str)]) -> KnowledgeBase {
        let mut kb = KnowledgeBase::in_memory().unwrap();
        kb.insert_many(pairs.iter().copied()).unwrap();
        kb
    }

    #[test]
    fn keywords_drop_stopwords_and_punctuation() {
        assert_eq!(extract_keywords("What is NTUST?"), vec!["ntust"]);
        assert_eq!(
            extract_keywords("Where is the NTUST library located? NTUST!"),
            vec!["ntust", "library", "located"]
        );
        assert!(extract_keywords("is it on?").is_empty());
    }

    #[test]
    fn score_is_fraction_of_keywords() {
        assert_eq!(match_score(&["ntust", "located"], "Where is NTUST located?"), 1.0);
        assert_eq!(match_score(&["ntust", "library"], "Where is NTUST located?"), 0.5);
        assert_eq!(match_score::<&str>(&[], "anything"), 0.0);
    }

    #[test]
    fn ranked_best_first_and_capped() {
        let kb = kb(&[
            ("When was NTUST founded?", "1974."),
            ("Where is NTUST located?", "Taipei."),
            ("Is NTUST a public university?", "Yes."),
            ("Does NTUST have dorms?", "Yes."),
            ("Where is the library located?", "Main campus."),
        ]);

        let lookup = kb.smart_query("Where is NTUST located?").unwrap();
        let Lookup::Ranked { keywords, matches } = lookup else {
            panic!("expected ranked lookup");
        };
        assert_eq!(keywords, vec!["ntust", "located"]);
        assert!(matches.len() <= MAX_MATCHES);
        assert_eq!(matches[0].entry.question, "Where is NTUST located?");
        assert_eq!(matches[0].relevance(), 100);
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn no_match_names_keywords() {
        let kb = kb(&[("When was NTUST founded?", "1974.")]);
        let lookup = kb.smart_query("cafeteria opening hours").unwrap();
        assert_eq!(
            lookup,
            Lookup::NoMatch {
                keywords: vec!["cafeteria".into(), "opening".into(), "hours".into()]
            }
        );
        assert!(lookup.to_string().contains("cafeteria, opening, hours"));
    }

    #[test]
    fn ranked_display_shows_relevance() {
        let kb = kb(&[("Where is NTUST located?", "Taipei.")]);
        let text = kb.smart_query("ntust located").unwrap().to_string();
        assert!(text.starts_with("Found 1 relevant result(s)"));
        assert!(text.contains("A: Taipei."));
        assert!(text.contains("Relevance: 100%"));
    }

    #[test]
    fn empty_query_has_no_keywords() {
        let kb = kb(&[("Where is NTUST located?", "Taipei.")]);
        let lookup = kb.smart_query("is it?").unwrap();
        assert_eq!(lookup, Lookup::NoMatch { keywords: vec![] });
    }

    #[test]
    fn ranking_covers_non_ascii_case() {
        let kb = kb(&[("Où est l'ÉCOLE?", "Rue Saint-Jacques.")]);
        let lookup = kb.smart_query("école").unwrap();
        assert!(matches!(lookup, Lookup::Ranked { ref matches, .. } if matches.len() == 1));
        assert!(kb.search_questions("école", MAX_MATCHES).unwrap().is_empty());
    }

    #[test]
    fn fallback_display_lists_entries() {
        let lookup = Lookup::Fallback {
            keyword: "ntust".into(),
            entries: vec![Entry {
                id: 1,
                question: "Where is NTUST located?".into(),
                answer: "Taipei.".into(),
            }],
        };
        let text = lookup.to_string();
        assert!(text.starts_with("Partial matches for \"ntust\":"));
        assert!(text.contains("A: Taipei."));
    }
}
