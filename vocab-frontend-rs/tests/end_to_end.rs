use std::cell::Cell;
use std::rc::Rc;

use stash::{KeyValueStore, MemoryStore, StoreError};
use vocab_frontend_rs::app::{BACKUPS_KEY, LIBRARY_KEY, SETTINGS_KEY};
use vocab_frontend_rs::challenges::QuestionKind;
use vocab_frontend_rs::library::{ALL_SCOPE_ID, LibraryError};
use vocab_frontend_rs::practice_queue::QueueError;
use vocab_frontend_rs::{
    NewWord, PracticeMode, SessionKind, Settings, TranslationConfig, VocabApp, VocabError,
    WordPatch,
};
use vocab_utils::AnswerMode;

fn new_word(term: &str, meaning: &str) -> NewWord {
    NewWord {
        term: term.to_string(),
        meaning_native: meaning.to_string(),
        ..Default::default()
    }
}

fn fresh_app() -> VocabApp<MemoryStore> {
    VocabApp::load_with_seed(MemoryStore::new(), 42).unwrap()
}

/// An app with a selected "Animals" wordbook containing the given words.
fn animals_app(words: &[(&str, &str)]) -> (VocabApp<MemoryStore>, String) {
    let mut app = fresh_app();
    let animals = app.add_wordbook("Animals", None).unwrap();
    app.select_wordbook(Some(animals.id.clone())).unwrap();
    for (term, meaning) in words {
        app.add_word(new_word(term, meaning)).unwrap();
    }
    (app, animals.id)
}

#[test]
fn test_fresh_install_is_seeded_and_saved() {
    let app = fresh_app();
    assert_eq!(app.library().wordbooks.len(), 1);
    assert_eq!(app.library().words[0].term, "apple");
    assert!(app.store().get(LIBRARY_KEY).unwrap().is_some());
    assert_eq!(app.scope().id(), ALL_SCOPE_ID);
    println!("✓ fresh install seeded");
}

#[test]
fn test_cat_scenario() {
    let (mut app, animals) = animals_app(&[("cat", "猫")]);

    let progress = app.start_session(SessionKind::Quiz).unwrap();
    assert_eq!(progress.length, 2);
    assert_eq!(app.session_progress(SessionKind::Quiz).unwrap().current_index, 0);

    let word = app.current_session_word(SessionKind::Quiz).unwrap();
    assert_eq!(word.term, "cat");
    assert_eq!(word.wordbook_id, animals);

    // two misses grow the queue to six and floor proficiency at zero
    let outcome = app.submit_session_answer(SessionKind::Quiz, "dog").unwrap();
    assert!(!outcome.correct);
    assert_eq!(outcome.expected, "cat");
    assert_eq!(outcome.progress.as_ref().unwrap().length, 4);
    let outcome = app.submit_session_answer(SessionKind::Quiz, "kat").unwrap();
    assert_eq!(outcome.progress.as_ref().unwrap().length, 6);
    assert_eq!(outcome.word.proficiency, 0);
    assert_eq!(outcome.word.error_count, 2);
    assert_eq!(outcome.word.correct_streak, 0);

    // recovering takes two correct answers in a row
    let outcome = app.submit_session_answer(SessionKind::Quiz, "Cat").unwrap();
    assert!(outcome.correct);
    assert_eq!(outcome.word.proficiency, 0);
    assert_eq!(outcome.word.correct_streak, 1);
    let outcome = app.submit_session_answer(SessionKind::Quiz, "cat").unwrap();
    assert_eq!(outcome.word.proficiency, 1);
    assert_eq!(outcome.word.error_count, 0);

    // the rest of the queue drains
    app.submit_session_answer(SessionKind::Quiz, "cat").unwrap();
    let last = app.submit_session_answer(SessionKind::Quiz, "cat").unwrap();
    let progress = last.progress.unwrap();
    assert!(progress.completed);
    assert_eq!(progress.total_attempts, 6);
    assert_eq!(progress.correct_attempts, 4);
    assert!((progress.accuracy - 4.0 / 6.0).abs() < 1e-9);
    assert_eq!(last.word.proficiency, 3);

    assert!(matches!(
        app.submit_session_answer(SessionKind::Quiz, "cat"),
        Err(VocabError::Queue(QueueError::Completed))
    ));
    // the library was persisted with the new proficiency
    let before = app.library().clone();
    let reloaded = VocabApp::load_with_seed(app.into_store(), 1).unwrap();
    assert_eq!(reloaded.library(), &before);
    let cat = reloaded
        .library()
        .words
        .iter()
        .find(|word| word.term == "cat")
        .unwrap();
    assert_eq!(cat.proficiency, 3);
    println!("✓ cat scenario");
}

#[test]
fn test_session_survives_reload() {
    let (mut app, _) = animals_app(&[("cat", "猫"), ("dog", "狗")]);
    app.start_session(SessionKind::Quiz).unwrap();
    // newest words come first, so the queue runs dog, cat, dog, cat
    let first = app.current_session_word(SessionKind::Quiz).unwrap();
    assert_eq!(first.term, "dog");
    app.submit_session_answer(SessionKind::Quiz, "wrong").unwrap();
    let second = app.current_session_word(SessionKind::Quiz).unwrap();
    assert_eq!(second.term, "cat");
    app.submit_session_answer(SessionKind::Quiz, &second.term).unwrap();
    let before = app.session_progress(SessionKind::Quiz).unwrap();

    let mut reloaded = VocabApp::load_with_seed(app.into_store(), 7).unwrap();
    assert!(reloaded.session_progress(SessionKind::Quiz).is_none());
    let after = reloaded.start_session(SessionKind::Quiz).unwrap();
    assert_eq!(after, before);
    assert_eq!(after.length, 6);
    assert_eq!(after.current_index, 2);

    // the practice slot is independent
    let practice = reloaded.start_session(SessionKind::Practice).unwrap();
    assert_eq!(practice.current_index, 0);
    assert_eq!(practice.length, 4);
}

#[test]
fn test_snapshot_is_scoped_to_wordbook() {
    let (mut app, animals) = animals_app(&[("cat", "猫")]);
    app.start_session(SessionKind::Quiz).unwrap();
    app.submit_session_answer(SessionKind::Quiz, "cat").unwrap();

    // switching wordbooks rebuilds the running session for the new scope
    let fruit = app.add_wordbook("Fruit", None).unwrap();
    app.select_wordbook(Some(fruit.id.clone())).unwrap();
    app.add_word(new_word("pear", "梨")).unwrap();
    app.add_word(new_word("plum", "李子")).unwrap();
    let progress = app.session_progress(SessionKind::Quiz).unwrap();
    assert_eq!(progress.current_index, 0);
    assert_eq!(progress.length, 0);

    let progress = app.restart_session(SessionKind::Quiz).unwrap();
    assert_eq!(progress.length, 4);

    // a snapshot saved for the fruit scope is not resumed under animals
    let mut reloaded = VocabApp::load_with_seed(app.into_store(), 3).unwrap();
    reloaded.select_wordbook(Some(animals)).unwrap();
    let progress = reloaded.start_session(SessionKind::Quiz).unwrap();
    assert_eq!(progress.length, 2);
    assert_eq!(progress.total_attempts, 0);
}

#[test]
fn test_removing_a_queued_word_rebuilds_the_session() {
    let (mut app, _) = animals_app(&[("cat", "猫"), ("dog", "狗")]);
    app.start_session(SessionKind::Quiz).unwrap();
    app.submit_session_answer(SessionKind::Quiz, "x").unwrap();

    let dog = app
        .library()
        .words
        .iter()
        .find(|word| word.term == "dog")
        .unwrap()
        .id
        .clone();
    app.remove_word(&dog).unwrap();

    let progress = app.session_progress(SessionKind::Quiz).unwrap();
    assert_eq!(progress.length, 2);
    assert_eq!(progress.total_attempts, 0);

    // archiving has the same effect
    let cat = app.current_session_word(SessionKind::Quiz).unwrap();
    app.set_archived(&cat.id, true).unwrap();
    let progress = app.session_progress(SessionKind::Quiz).unwrap();
    assert_eq!(progress.length, 0);
    assert!(progress.completed);
    assert_eq!(progress.accuracy, 0.0);
}

#[test]
fn test_clear_progress_starts_over() {
    let (mut app, _) = animals_app(&[("cat", "猫")]);
    app.start_session(SessionKind::Practice).unwrap();
    app.submit_session_answer(SessionKind::Practice, "nope").unwrap();
    let progress = app.clear_progress(SessionKind::Practice).unwrap();
    assert_eq!(progress.length, 2);
    assert_eq!(progress.total_attempts, 0);
}

#[test]
fn test_unreadable_records() {
    // settings and progress fall back to defaults
    let mut store = MemoryStore::new();
    store.set(SETTINGS_KEY, "{\"quizOrder\": 12}").unwrap();
    store.set(BACKUPS_KEY, "[]").unwrap();
    store
        .set(SessionKind::Quiz.storage_key(), "{\"wordQueue\": []}")
        .unwrap();
    let mut app = VocabApp::load_with_seed(store, 0).unwrap();
    assert_eq!(app.settings(), &Settings::default());
    let progress = app.start_session(SessionKind::Quiz).unwrap();
    assert_eq!(progress.length, 2);

    // but a broken library is refused rather than replaced
    let mut store = MemoryStore::new();
    store.set(LIBRARY_KEY, "{\"words\": 3}").unwrap();
    assert!(matches!(
        VocabApp::load_with_seed(store, 0),
        Err(VocabError::Store(StoreError::Corrupt { .. }))
    ));
}

#[test]
fn test_free_quiz_and_answer_modes() {
    let (mut app, _) = animals_app(&[("cat", "猫，猫咪")]);
    let word = app.next_quiz_word().unwrap();
    assert_eq!(word.term, "cat");

    let outcome = app.submit_quiz_answer(&word.id, "CAT").unwrap();
    assert!(outcome.correct);
    assert!(outcome.progress.is_none());
    assert_eq!(outcome.word.proficiency, 1);

    let settings = Settings {
        answer_mode: AnswerMode::RecallMeaning,
        ..app.settings().clone()
    };
    app.update_settings(settings).unwrap();
    let outcome = app.submit_quiz_answer(&word.id, "猫咪").unwrap();
    assert!(outcome.correct);
    assert_eq!(outcome.expected, "猫，猫咪");
    let outcome = app.submit_quiz_answer(&word.id, "狗").unwrap();
    assert!(!outcome.correct);
    assert_eq!(outcome.word.proficiency, 1);

    assert!(matches!(
        app.submit_quiz_answer("missing", "cat"),
        Err(VocabError::Library(LibraryError::UnknownWord(_)))
    ));
}

#[test]
fn test_duplicates_are_rejected_per_wordbook() {
    let (mut app, _) = animals_app(&[("cat", "猫")]);
    assert!(matches!(
        app.add_word(new_word("CAT", "猫")),
        Err(VocabError::Library(LibraryError::DuplicateWord(_)))
    ));

    app.select_wordbook(None).unwrap();
    assert!(matches!(
        app.add_word(new_word("cow", "奶牛")),
        Err(VocabError::Library(LibraryError::NoWordbookSelected))
    ));
    assert!(matches!(
        app.select_wordbook(Some("nope".to_string())),
        Err(VocabError::Library(LibraryError::UnknownWordbook(_)))
    ));
}

#[test]
fn test_practice_questions_follow_the_session() {
    let (mut app, _) =
        animals_app(&[("cat", "猫"), ("dog", "狗"), ("cow", "奶牛"), ("pig", "猪")]);
    app.start_session(SessionKind::Practice).unwrap();
    let expected = app.current_session_word(SessionKind::Practice).unwrap();

    let question = app.practice_question(PracticeMode::Spell).unwrap();
    assert_eq!(question.kind, QuestionKind::Spell);
    assert_eq!(question.word.id, expected.id);
    assert_eq!(question.options.len(), 4);
    assert!(question.options.contains(&expected.term));

    let wrong = question
        .options
        .iter()
        .find(|option| **option != expected.term)
        .unwrap()
        .clone();
    let outcome = app.submit_practice_answer(&question, &wrong).unwrap();
    assert!(!outcome.correct);
    assert_eq!(outcome.progress.unwrap().length, 10);

    let question = app.practice_question(PracticeMode::Meaning).unwrap();
    let answer = question.correct_answer.clone();
    let outcome = app.submit_practice_answer(&question, &answer).unwrap();
    assert!(outcome.correct);
    assert_eq!(outcome.progress.unwrap().current_index, 2);
}

#[test]
fn test_practice_without_a_session() {
    let (mut app, _) = animals_app(&[("cat", "猫"), ("dog", "狗")]);
    let question = app.practice_question(PracticeMode::Listen).unwrap();
    assert_eq!(question.kind, QuestionKind::Listen);
    assert_eq!(question.prompt, question.word.term);
    let answer = question.correct_answer.clone();
    let outcome = app.submit_practice_answer(&question, &answer).unwrap();
    assert!(outcome.correct);
    assert!(outcome.progress.is_none());
}

#[test]
fn test_export_then_import() {
    let (mut app, animals) = animals_app(&[("cat", "猫"), ("dog", "狗")]);
    let data = app.export_wordbook(&animals).unwrap();

    let summary = app.import_wordbook(&data, None).unwrap();
    assert_eq!(summary.wordbook_name, "Animals (imported)");
    assert_eq!(summary.new_count, 2);
    assert_eq!(app.settings().current_wordbook_id, Some(summary.wordbook_id.clone()));

    let summary = app.import_wordbook(&data, Some(&animals)).unwrap();
    assert!(summary.is_append);
    assert_eq!(summary.new_count, 0);
    assert_eq!(summary.skipped_count, 2);
}

#[test]
fn test_backups() {
    let mut app = fresh_app();
    assert!(app.backups().is_empty());

    // the first edit triggers an automatic backup
    let default_wordbook = app.library().wordbooks[0].id.clone();
    let in_default = |term: &str, meaning: &str| NewWord {
        wordbook_id: Some(default_wordbook.clone()),
        ..new_word(term, meaning)
    };
    app.add_word(in_default("pear", "梨")).unwrap();
    assert_eq!(app.backups().len(), 1);
    // the next small edit within five minutes does not
    app.add_word(in_default("plum", "李子")).unwrap();
    assert_eq!(app.backups().len(), 1);

    app.create_backup().unwrap();
    let backups = app.backups();
    assert_eq!(backups.len(), 2);
    assert_eq!(backups[0].word_count, 3);
    assert_eq!(backups[1].word_count, 2);

    let restored = app.restore_backup_as_new_wordbook(1).unwrap();
    assert_eq!(app.settings().current_wordbook_id, Some(restored.clone()));
    assert_eq!(app.words_in_scope().len(), 2);

    app.restore_backup(0).unwrap();
    assert_eq!(app.library().words.len(), 3);
    // the restored-into wordbook is gone, so the selection was cleared
    assert_eq!(app.settings().current_wordbook_id, None);

    assert!(matches!(
        app.restore_backup(9),
        Err(VocabError::Backup(_))
    ));
}

#[test]
fn test_update_word_through_app() {
    let (mut app, _) = animals_app(&[("cat", "猫")]);
    let cat = app.next_quiz_word().unwrap();
    let updated = app
        .update_word(
            &cat.id,
            WordPatch {
                meaning_native: Some("猫，猫咪".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.meanings(), vec!["猫", "猫咪"]);
}

/// A store whose library writes can be switched off.
struct FlakyStore {
    inner: MemoryStore,
    fail_library: Rc<Cell<bool>>,
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if key == LIBRARY_KEY && self.fail_library.get() {
            return Err(StoreError::Write {
                key: key.to_string(),
                reason: "quota exceeded".to_string(),
            });
        }
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }
}

#[test]
fn test_failed_library_write_leaves_session_untouched() {
    let fail_library = Rc::new(Cell::new(false));
    let store = FlakyStore {
        inner: MemoryStore::new(),
        fail_library: fail_library.clone(),
    };
    let mut app = VocabApp::load_with_seed(store, 5).unwrap();
    app.start_session(SessionKind::Quiz).unwrap();
    let apple = app.current_session_word(SessionKind::Quiz).unwrap();
    let before = app.session_progress(SessionKind::Quiz).unwrap();

    fail_library.set(true);
    assert!(matches!(
        app.submit_session_answer(SessionKind::Quiz, "apple"),
        Err(VocabError::Store(StoreError::Write { .. }))
    ));
    assert_eq!(app.session_progress(SessionKind::Quiz).unwrap(), before);
    assert_eq!(app.word(&apple.id).unwrap(), &apple);

    // once storage recovers the same answer goes through
    fail_library.set(false);
    let outcome = app.submit_session_answer(SessionKind::Quiz, "apple").unwrap();
    assert_eq!(outcome.word.proficiency, 1);
    assert_eq!(outcome.progress.unwrap().current_index, 1);
}

#[test]
fn test_translation_keys_persist() {
    let mut app = fresh_app();
    assert!(app.translation_config().baidu().is_none());

    let config = TranslationConfig {
        baidu_app_id: Some(" 2015063000000001 ".to_string()),
        baidu_secret: Some("12345678".to_string()),
        baidu_api_url: None,
    };
    app.update_translation_config(config).unwrap();

    let reloaded = VocabApp::load_with_seed(app.into_store(), 2).unwrap();
    let config = reloaded.translation_config();
    assert_eq!(config.baidu_app_id.as_deref(), Some("2015063000000001"));
    assert!(config.baidu().is_some());
}
