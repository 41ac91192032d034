use super::*;
use anyhow::anyhow;
use serde_json::json;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use crate::models::{
    BirthDateFormat, MissingField, Outcome, Payload, RecordError, RecordStatus, RegistryDate,
    SsnSegments, Surnames,
};

/// Registry keyed by SSN serial (background) or surname (certification).
#[derive(Default)]
struct FakeRegistry {
    matches: HashMap<String, Payload>,
    failing: Vec<String>,
    calls: RefCell<Vec<String>>,
}

impl FakeRegistry {
    fn matching(mut self, key: &str, payload: serde_json::Value) -> Self {
        self.matches
            .insert(key.to_string(), payload.as_object().unwrap().clone());
        self
    }

    fn failing(mut self, key: &str) -> Self {
        self.failing.push(key.to_string());
        self
    }

    fn answer(&self, key: &str) -> Result<Option<Payload>> {
        self.calls.borrow_mut().push(key.to_string());
        if self.failing.iter().any(|f| f == key) {
            return Err(anyhow!("registry unavailable for {key}"));
        }
        Ok(self.matches.get(key).cloned())
    }
}

impl Registry for FakeRegistry {
    fn background_check(&self, ssn: &SsnSegments, _dob: &RegistryDate) -> Result<Option<Payload>> {
        self.answer(&ssn.serial)
    }

    fn certification_check(&self, surname: &str, _ssn: &SsnSegments) -> Result<Option<Payload>> {
        self.answer(surname)
    }
}

#[derive(Default)]
struct CountingPause(RefCell<Vec<Duration>>);

impl Pause for CountingPause {
    fn pause(&self, duration: Duration) {
        self.0.borrow_mut().push(duration);
    }
}

#[derive(Default)]
struct MemoryStore {
    keys: RefCell<Vec<String>>,
    reject: bool,
}

impl ObjectStore for MemoryStore {
    fn upload_file(&self, _local_path: &Path, key: &str) -> Result<()> {
        if self.reject {
            anyhow::bail!("bucket is read-only");
        }
        self.keys.borrow_mut().push(key.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct Outbox(RefCell<Vec<(String, String)>>);

impl Notifier for Outbox {
    fn send(&self, subject: &str, body: &str) -> Result<()> {
        self.0
            .borrow_mut()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

fn options(check: CheckType, pause_between_surnames: bool) -> PipelineOptions {
    PipelineOptions {
        check,
        wait_time: Duration::from_secs(5),
        pause_between_surnames,
    }
}

fn worker(id: &str, employee_number: &str, serial: &str) -> WorkerRecord {
    WorkerRecord {
        worker_id: id.to_string(),
        employee_number: Some(employee_number.to_string()),
        ssn: Some(format!("123-45-{serial}")),
        birth_date: Some("1990-07-04".to_string()),
        birth_date_format: BirthDateFormat::YearMonthDay,
        ..Default::default()
    }
}

fn with_surnames(mut record: WorkerRecord, names: [Option<&str>; 3]) -> WorkerRecord {
    record.surnames = Surnames {
        legal: names[0].map(str::to_string),
        maiden: names[1].map(str::to_string),
        preferred: names[2].map(str::to_string),
    };
    record
}

#[test]
fn test_background_match() {
    let registry = FakeRegistry::default().matching("6789", json!({"status": "clear"}));
    let pause = CountingPause::default();
    let opts = options(CheckType::BackgroundCheck, true);
    let invoker = Invoker::new(&registry, &pause, &opts);

    let invocation = invoker.verify(&worker("W1", "E100", "6789"));
    assert_eq!(invocation.registry_calls, 1);
    match invocation.outcome {
        Outcome::Match(result) => {
            assert_eq!(result.employee_number, "E100");
            assert_eq!(result.worker_id, "W1");
        }
        other => panic!("expected match, got {other:?}"),
    }
}

#[test]
fn test_missing_data_never_calls_registry() {
    let registry = FakeRegistry::default();
    let pause = CountingPause::default();
    let opts = options(CheckType::BackgroundCheck, true);
    let invoker = Invoker::new(&registry, &pause, &opts);

    let mut no_ssn = worker("W1", "E100", "6789");
    no_ssn.ssn = Some(String::new());
    let mut no_dob = worker("W2", "E200", "6789");
    no_dob.birth_date = Some(String::new());

    for (record, field) in [(no_ssn, MissingField::Ssn), (no_dob, MissingField::BirthDate)] {
        let invocation = invoker.verify(&record);
        assert_eq!(invocation.registry_calls, 0);
        match invocation.outcome {
            Outcome::MissingInput(e) => assert_eq!(e.field, field),
            other => panic!("expected missing input, got {other:?}"),
        }
    }
    assert!(registry.calls.borrow().is_empty());
}

#[test]
fn test_lookup_error_is_contained() {
    let registry = FakeRegistry::default().failing("6789");
    let pause = CountingPause::default();
    let opts = options(CheckType::BackgroundCheck, true);
    let invoker = Invoker::new(&registry, &pause, &opts);

    let invocation = invoker.verify(&worker("W1", "E100", "6789"));
    assert_eq!(invocation.registry_calls, 1);
    assert!(matches!(invocation.outcome, Outcome::Error(RecordError::Lookup(_))));
}

#[test]
fn test_empty_payload_is_no_match() {
    let registry = FakeRegistry::default().matching("6789", json!({}));
    let pause = CountingPause::default();
    let opts = options(CheckType::BackgroundCheck, true);
    let invoker = Invoker::new(&registry, &pause, &opts);

    let invocation = invoker.verify(&worker("W1", "E100", "6789"));
    assert!(matches!(invocation.outcome, Outcome::NoMatch));
}

#[test]
fn test_certification_short_circuits_on_first_match() {
    let registry = FakeRegistry::default().matching("Smyth", json!({"certificate": "CEAS"}));
    let pause = CountingPause::default();
    let opts = options(CheckType::Certification, false);
    let invoker = Invoker::new(&registry, &pause, &opts);

    let record = with_surnames(
        worker("W1", "E100", "6789"),
        [Some("Smith"), Some("Smyth"), Some("Smithe")],
    );
    let invocation = invoker.verify(&record);

    assert_eq!(*registry.calls.borrow(), vec!["Smith", "Smyth"]);
    assert_eq!(invocation.registry_calls, 2);
    match invocation.outcome {
        Outcome::Match(result) => {
            assert_eq!(result.payload.get("certificate"), Some(&json!("CEAS")))
        }
        other => panic!("expected match, got {other:?}"),
    }
    assert!(pause.0.borrow().is_empty());
}

#[test]
fn test_certification_exhausts_candidates() {
    let registry = FakeRegistry::default();
    let pause = CountingPause::default();
    let opts = options(CheckType::Certification, true);
    let invoker = Invoker::new(&registry, &pause, &opts);

    let record = with_surnames(
        worker("W1", "E100", "6789"),
        [Some("Smith"), Some("Smith"), Some("Jones")],
    );
    let invocation = invoker.verify(&record);

    assert!(matches!(invocation.outcome, Outcome::NoMatch));
    assert_eq!(*registry.calls.borrow(), vec!["Smith", "Jones"]);
    // Pauses between attempts, not before the first.
    assert_eq!(*pause.0.borrow(), vec![Duration::from_secs(5)]);
}

#[test]
fn test_certification_error_stops_candidates() {
    let registry = FakeRegistry::default().failing("Smith");
    let pause = CountingPause::default();
    let opts = options(CheckType::Certification, true);
    let invoker = Invoker::new(&registry, &pause, &opts);

    let record = with_surnames(worker("W1", "E100", "6789"), [Some("Smith"), Some("Jones"), None]);
    let invocation = invoker.verify(&record);

    assert_eq!(*registry.calls.borrow(), vec!["Smith"]);
    match invocation.outcome {
        Outcome::Error(e) => assert!(e.to_string().contains("surname Smith")),
        other => panic!("expected error, got {other:?}"),
    }
}

#[test]
fn test_router_upload_failure_becomes_error() {
    let temp = tempfile::tempdir().unwrap();
    let writer = ArtifactWriter::new(temp.path(), "njdoe");
    let store = MemoryStore {
        reject: true,
        ..Default::default()
    };
    let outbox = Outbox::default();
    let router = Router::new(CheckType::BackgroundCheck, &writer, &store, &outbox, "run-1");

    let registry = FakeRegistry::default().matching("6789", json!({"status": "clear"}));
    let pause = CountingPause::default();
    let opts = options(CheckType::BackgroundCheck, true);
    let record = worker("W1", "E100", "6789");
    let outcome = Invoker::new(&registry, &pause, &opts).verify(&record).outcome;

    assert_eq!(router.route(&record, outcome), RecordStatus::Failed);
    let sent = outbox.0.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "NJDOE Background Check Error - W1");
    assert!(sent[0].1.contains("bucket is read-only"));
}

#[test]
fn test_router_missing_data_sends_no_alert() {
    let temp = tempfile::tempdir().unwrap();
    let writer = ArtifactWriter::new(temp.path(), "njdoe");
    let store = MemoryStore::default();
    let outbox = Outbox::default();
    let router = Router::new(CheckType::BackgroundCheck, &writer, &store, &outbox, "run-1");

    let missing = crate::models::MissingInputError::absent(MissingField::Ssn);
    let status = router.route(&worker("W1", "E1", "0001"), Outcome::MissingInput(missing));

    assert_eq!(status, RecordStatus::MissingData);
    assert!(outbox.0.borrow().is_empty());
    assert!(store.keys.borrow().is_empty());
}

#[test]
fn test_run_pauses_only_between_invoked_records() {
    let temp = tempfile::tempdir().unwrap();
    let writer = ArtifactWriter::new(temp.path(), "njdoe");
    let registry = FakeRegistry::default()
        .matching("0001", json!({"status": "clear"}))
        .failing("0003");
    let store = MemoryStore::default();
    let outbox = Outbox::default();
    let pause = CountingPause::default();
    let opts = options(CheckType::BackgroundCheck, true);

    let mut missing = worker("W2", "E2", "0002");
    missing.birth_date = None;
    let records = vec![
        worker("W1", "E1", "0001"),
        missing,
        worker("W3", "E3", "0003"),
        worker("W4", "E4", "0004"),
    ];

    let pipeline = Pipeline::new(
        &opts,
        &writer,
        Collaborators {
            registry: &registry,
            store: &store,
            notifier: &outbox,
            pause: &pause,
        },
        "run-1",
    );
    let summary = pipeline.run(&records);

    assert_eq!(summary.uploaded.len(), 1);
    assert_eq!(summary.missing_data, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.no_match, 1);
    // W1 and W3 pause; W2 never called the registry; W4 is last.
    assert_eq!(pause.0.borrow().len(), 2);
}

#[test]
fn test_path_like_employee_number_writes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let writer = ArtifactWriter::new(temp.path(), "njdoe");
    let registry = FakeRegistry::default().matching("6789", json!({"status": "clear"}));
    let store = MemoryStore::default();
    let outbox = Outbox::default();
    let pause = CountingPause::default();
    let opts = options(CheckType::BackgroundCheck, true);

    let pipeline = Pipeline::new(
        &opts,
        &writer,
        Collaborators {
            registry: &registry,
            store: &store,
            notifier: &outbox,
            pause: &pause,
        },
        "run-1",
    );
    let summary = pipeline.run(&[worker("W1", "12/34", "6789")]);

    assert_eq!(summary.missing_data, 1);
    assert!(registry.calls.borrow().is_empty());
    assert!(store.keys.borrow().is_empty());
    assert!(!temp.path().join("background_check").exists());
}
