//! Item selection policies and planning contexts.
//!
//! Selection is one interface with interchangeable policies behind it;
//! callers construct the policy they want and pass it in explicitly, never
//! through a shared planner instance. The baseline policy is uniform-random
//! choice; the same planner can also seed new decks from an external
//! frequency list (see [`WordSource`]). The quiz variant draws from a fixed
//! pre-sampled pool instead and lives in [`crate::quiz`], because its pick
//! must be atomic with the pool's bookkeeping.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::EngineError;
use crate::item::WordItem;
use crate::learner::Learner;
use crate::store::StoreError;

/// Default language for the deck-seeding word source.
pub const DEFAULT_LANG: &str = "en";

/// How deep into the frequency list to sample.
pub const DEFAULT_TOP: usize = 5000;

/// Most-frequent entries to skip; function words make poor flashcards.
pub const DEFAULT_SKIP: usize = 200;

/// Caller-side state threaded through selections.
pub trait PlanningContext {
    /// Observe the outcome of one presentation.
    fn update(
        &mut self,
        item: &WordItem,
        answer: Option<&str>,
        time: i64,
    ) -> Result<(), EngineError>;
}

/// Context that tracks nothing.
#[derive(Debug, Default)]
pub struct EmptyPlanningContext;

impl PlanningContext for EmptyPlanningContext {
    fn update(&mut self, _: &WordItem, _: Option<&str>, _: i64) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Counts down a fixed number of presentations.
#[derive(Debug)]
pub struct FixedHorizonContext {
    pub horizon: i64,
}

impl FixedHorizonContext {
    pub fn new(horizon: i64) -> Self {
        Self { horizon }
    }
}

impl PlanningContext for FixedHorizonContext {
    fn update(&mut self, _: &WordItem, _: Option<&str>, _: i64) -> Result<(), EngineError> {
        self.horizon -= 1;
        Ok(())
    }
}

/// Feeds every shown item to a simulated learner, for evaluating policies
/// against the memory model.
pub struct FixedLearnerContext {
    pub learner: Learner,
}

impl FixedLearnerContext {
    pub fn new(learner: Learner) -> Self {
        Self { learner }
    }
}

impl PlanningContext for FixedLearnerContext {
    fn update(
        &mut self,
        item: &WordItem,
        _answer: Option<&str>,
        time: i64,
    ) -> Result<(), EngineError> {
        self.learner.learn(item, None, time)
    }
}

/// A selection policy over an ephemeral candidate set.
pub trait Planner {
    /// Choose the next item to present.
    fn choose_item<'a>(
        &mut self,
        material: &'a [WordItem],
        context: &mut dyn PlanningContext,
        time: i64,
    ) -> Result<&'a WordItem, EngineError>;
}

/// External frequency list plus translation lookup, used to seed decks with
/// words the user has not met yet.
pub trait WordSource {
    /// The `top` most frequent words of `lang`, most frequent first.
    fn top_words(&self, lang: &str, top: usize) -> Result<Vec<String>, StoreError>;

    /// Translation of one word, if the source knows it.
    fn translate(&self, lang: &str, word: &str) -> Result<Option<String>, StoreError>;
}

/// Uniform-random selection.
pub struct RandomPlanner {
    lang: String,
    top: usize,
    skip: usize,
    rng: ChaCha8Rng,
}

impl RandomPlanner {
    pub fn new() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy())
    }

    /// Deterministic planner for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(rng: ChaCha8Rng) -> Self {
        Self {
            lang: DEFAULT_LANG.to_string(),
            top: DEFAULT_TOP,
            skip: DEFAULT_SKIP,
            rng,
        }
    }

    /// Override the frequency-list sampling window.
    pub fn with_profile(mut self, lang: &str, top: usize, skip: usize) -> Self {
        self.lang = lang.to_string();
        self.top = top;
        self.skip = skip;
        self
    }

    /// Sample `count` distinct words from the frequency list, skipping the
    /// most frequent entries.
    pub fn choose_multiple(
        &mut self,
        source: &dyn WordSource,
        count: usize,
    ) -> Result<Vec<String>, EngineError> {
        let words = source.top_words(&self.lang, self.top)?;
        let candidates = words.get(self.skip..).unwrap_or(&[]);
        if candidates.len() < count {
            return Err(EngineError::InvalidInput(format!(
                "word source offers {} candidates, {} requested",
                candidates.len(),
                count
            )));
        }
        Ok(self.pick_distinct(candidates, count))
    }

    /// Draw `count` unseen words and pair each with its translation, ready
    /// to seed a new deck.
    pub fn load_chosen_words(
        &mut self,
        source: &dyn WordSource,
        count: usize,
        known: &HashSet<String>,
    ) -> Result<Vec<WordItem>, EngineError> {
        let words = source.top_words(&self.lang, self.top)?;
        let candidates: Vec<String> = words
            .get(self.skip..)
            .unwrap_or(&[])
            .iter()
            .filter(|word| !known.contains(*word))
            .cloned()
            .collect();
        if candidates.len() < count {
            return Err(EngineError::InvalidInput(format!(
                "word source offers {} unseen candidates, {} requested",
                candidates.len(),
                count
            )));
        }
        let mut items = Vec::with_capacity(count);
        for word in self.pick_distinct(&candidates, count) {
            let translation = source
                .translate(&self.lang, &word)?
                .ok_or_else(|| EngineError::NotFound(format!("no translation for {word}")))?;
            items.push(WordItem::new(word, translation));
        }
        Ok(items)
    }

    fn pick_distinct(&mut self, candidates: &[String], count: usize) -> Vec<String> {
        candidates
            .choose_multiple(&mut self.rng, count)
            .cloned()
            .collect()
    }
}

impl Default for RandomPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Planner for RandomPlanner {
    fn choose_item<'a>(
        &mut self,
        material: &'a [WordItem],
        _context: &mut dyn PlanningContext,
        _time: i64,
    ) -> Result<&'a WordItem, EngineError> {
        material
            .choose(&mut self.rng)
            .ok_or(EngineError::EmptyCandidateSet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticWordSource {
        words: Vec<String>,
        translations: HashMap<String, String>,
    }

    impl StaticWordSource {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                words: pairs.iter().map(|(w, _)| w.to_string()).collect(),
                translations: pairs
                    .iter()
                    .map(|(w, t)| (w.to_string(), t.to_string()))
                    .collect(),
            }
        }
    }

    impl WordSource for StaticWordSource {
        fn top_words(&self, _lang: &str, top: usize) -> Result<Vec<String>, StoreError> {
            Ok(self.words.iter().take(top).cloned().collect())
        }

        fn translate(&self, _lang: &str, word: &str) -> Result<Option<String>, StoreError> {
            Ok(self.translations.get(word).cloned())
        }
    }

    fn material() -> Vec<WordItem> {
        vec![
            WordItem::new("dog", "hund"),
            WordItem::new("cat", "katze"),
            WordItem::new("bird", "vogel"),
        ]
    }

    #[test]
    fn test_single_candidate_is_always_chosen() {
        let mut planner = RandomPlanner::with_seed(1);
        let mut context = EmptyPlanningContext;
        let material = vec![WordItem::new("dog", "hund")];
        for time in 0..20 {
            let chosen = planner.choose_item(&material, &mut context, time).unwrap();
            assert_eq!(chosen.question(), "dog");
        }
    }

    #[test]
    fn test_empty_candidates_fail() {
        let mut planner = RandomPlanner::with_seed(1);
        let mut context = EmptyPlanningContext;
        assert!(matches!(
            planner.choose_item(&[], &mut context, 0),
            Err(EngineError::EmptyCandidateSet)
        ));
    }

    #[test]
    fn test_uniform_choice_covers_all_candidates() {
        // Statistical: 3 candidates, 3000 draws; each should land well
        // within [800, 1200] of the expected 1000.
        let mut planner = RandomPlanner::with_seed(42);
        let mut context = EmptyPlanningContext;
        let material = material();
        let mut counts: HashMap<String, u32> = HashMap::new();
        for time in 0..3000 {
            let chosen = planner.choose_item(&material, &mut context, time).unwrap();
            *counts.entry(chosen.question().to_string()).or_insert(0) += 1;
        }
        assert_eq!(counts.len(), 3);
        for (_, count) in counts {
            assert!((800..=1200).contains(&count), "count out of range: {count}");
        }
    }

    #[test]
    fn test_fixed_horizon_counts_down() {
        let mut context = FixedHorizonContext::new(2);
        let dog = WordItem::new("dog", "hund");
        context.update(&dog, Some("hund"), 0).unwrap();
        context.update(&dog, None, 1).unwrap();
        assert_eq!(context.horizon, 0);
    }

    #[test]
    fn test_fixed_learner_context_learns_shown_items() {
        let mut context = FixedLearnerContext::new(Learner::with_seed(0.4, 0.1, 1));
        let dog = WordItem::new("dog", "hund");
        context.update(&dog, None, 5).unwrap();
        context.update(&dog, None, 9).unwrap();
        let state = context.learner.state("dog").unwrap();
        assert_eq!(state.n_occurrences, 2);
        assert_eq!(state.last_occurrence, 9);
    }

    #[test]
    fn test_choose_multiple_skips_frequent_words() {
        let pairs: Vec<(String, String)> = (0..30)
            .map(|i| (format!("word{i}"), format!("wort{i}")))
            .collect();
        let pairs_ref: Vec<(&str, &str)> = pairs
            .iter()
            .map(|(w, t)| (w.as_str(), t.as_str()))
            .collect();
        let source = StaticWordSource::new(&pairs_ref);

        let mut planner = RandomPlanner::with_seed(3).with_profile("en", 30, 10);
        let chosen = planner.choose_multiple(&source, 5).unwrap();
        assert_eq!(chosen.len(), 5);
        let distinct: HashSet<&String> = chosen.iter().collect();
        assert_eq!(distinct.len(), 5);
        for word in &chosen {
            let index: usize = word.trim_start_matches("word").parse().unwrap();
            assert!(index >= 10, "sampled a skipped word: {word}");
        }
    }

    #[test]
    fn test_load_chosen_words_excludes_known_and_translates() {
        let source = StaticWordSource::new(&[
            ("dog", "hund"),
            ("cat", "katze"),
            ("bird", "vogel"),
            ("fish", "fisch"),
        ]);
        let known: HashSet<String> = ["dog".to_string()].into();

        let mut planner = RandomPlanner::with_seed(3).with_profile("en", 10, 0);
        let items = planner.load_chosen_words(&source, 3, &known).unwrap();
        assert_eq!(items.len(), 3);
        for item in &items {
            assert_ne!(item.question(), "dog");
            assert!(!item.answer().is_empty());
        }
    }

    #[test]
    fn test_load_chosen_words_not_enough_material() {
        let source = StaticWordSource::new(&[("dog", "hund")]);
        let mut planner = RandomPlanner::with_seed(3).with_profile("en", 10, 0);
        assert!(matches!(
            planner.load_chosen_words(&source, 2, &HashSet::new()),
            Err(EngineError::InvalidInput(_))
        ));
    }
}
