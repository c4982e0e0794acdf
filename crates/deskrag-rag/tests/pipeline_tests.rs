mod common;

use std::sync::Arc;
use std::time::Duration;

use deskrag_core::error::{Error, GenerationError};
use deskrag_core::types::{AnswerStatus, Citation};
use deskrag_rag::answer::{GENERATION_FAILED, NO_KNOWLEDGE_BASE};
use deskrag_embed::HashEmbedder;
use deskrag_rag::prompt::REFUSAL;
use deskrag_rag::ServiceDesk;
use deskrag_vector::IndexHandle;

use common::{desk, FailingGenerator, GroundedGenerator, SlowGenerator, HELPDESK_KB, VPN_KB};

#[tokio::test]
async fn vpn_question_is_answered_and_cites_vpn_txt() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = Arc::new(GroundedGenerator::it_helpdesk());
    let desk = desk(tmp.path(), VPN_KB, generator.clone());

    let answer = desk.ask("How do I connect to the VPN?").await.expect("ask");

    assert_eq!(answer.status, AnswerStatus::Answered);
    assert_eq!(answer.citation, Citation::Source("vpn.txt".to_string()));
    assert!(answer.text.contains("Client X"));
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn unrelated_question_is_refused_but_still_cites_the_consulted_document() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = Arc::new(GroundedGenerator::it_helpdesk());
    let desk = desk(tmp.path(), VPN_KB, generator.clone());

    let answer = desk.ask("How do I reset my payroll PIN?").await.expect("ask");

    assert_eq!(answer.status, AnswerStatus::Refused);
    assert_eq!(answer.text, REFUSAL);
    assert_eq!(answer.citation, Citation::Source("vpn.txt".to_string()));
    let prompt = generator.last_prompt().expect("generator was called");
    assert!(prompt.user.contains("To connect to VPN, open Client X"), "the refused document was in the prompt");
}

#[tokio::test]
async fn empty_knowledge_base_never_calls_the_generator() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = Arc::new(GroundedGenerator::it_helpdesk());
    let desk = desk(tmp.path(), &[], generator.clone());

    for q in ["How do I connect to the VPN?", "anything at all"] {
        let answer = desk.ask(q).await.expect("ask");
        assert_eq!(answer.status, AnswerStatus::NoKnowledgeBase);
        assert_eq!(answer.citation, Citation::NoSource);
        assert_eq!(answer.text, NO_KNOWLEDGE_BASE);
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn retrieval_picks_the_matching_document_among_several() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = Arc::new(GroundedGenerator::it_helpdesk());
    let desk = desk(tmp.path(), HELPDESK_KB, generator.clone());

    let printer = desk.ask("How do I add a printer?").await.unwrap();
    let vpn = desk.ask("connect to VPN").await.unwrap();
    let password = desk.ask("reset my password").await.unwrap();

    assert_eq!(printer.citation.source_name(), Some("printer.txt"));
    assert_eq!(printer.status, AnswerStatus::Answered);
    assert_eq!(vpn.citation.source_name(), Some("vpn.txt"));
    assert_eq!(password.citation.source_name(), Some("password.txt"));
    assert_eq!(password.status, AnswerStatus::Refused, "no rule covers passwords");
}

#[tokio::test]
async fn prompt_carries_only_the_top_document() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = Arc::new(GroundedGenerator::it_helpdesk());
    let desk = desk(tmp.path(), HELPDESK_KB, generator.clone()).with_k(3);

    desk.ask("How do I add a printer?").await.unwrap();

    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.user.contains("floor printer"));
    assert!(!prompt.user.contains("Client X"));
    assert!(!prompt.user.contains("self-service portal"));
}

#[tokio::test]
async fn asking_twice_cites_the_same_document() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = desk(tmp.path(), HELPDESK_KB, Arc::new(GroundedGenerator::it_helpdesk()));

    let first = desk.ask("my printer is not listed").await.unwrap();
    let second = desk.ask("my printer is not listed").await.unwrap();

    assert_eq!(first.citation, second.citation);
    assert_eq!(first.text, second.text);
}

#[tokio::test]
async fn generation_failure_is_distinct_from_refusal() {
    let tmp = tempfile::tempdir().unwrap();
    let error = GenerationError::Status { code: 503, body: "overloaded".to_string() };
    let generator = Arc::new(FailingGenerator::new(error.clone()));
    let desk = desk(tmp.path(), VPN_KB, generator.clone());

    let answer = desk.ask("How do I connect to the VPN?").await.expect("failure is an answer, not an Err");

    assert_eq!(answer.status, AnswerStatus::GenerationFailed(error.clone()));
    assert!(answer.is_failure());
    assert_ne!(answer.status, AnswerStatus::Refused);
    assert_eq!(answer.citation, Citation::NoSource);
    assert_eq!(answer.text, GENERATION_FAILED);
    assert!(error.is_retryable());
}

#[tokio::test]
async fn failed_query_leaves_the_index_usable() {
    let tmp = tempfile::tempdir().unwrap();
    let failing = desk(tmp.path(), VPN_KB, Arc::new(FailingGenerator::new(GenerationError::Transport("reset".into()))));
    assert!(failing.ask("connect to the VPN").await.unwrap().is_failure());

    let index = failing.index().current();
    assert_eq!(index.len(), 1);
    assert_eq!(index.documents()[0].source_name, "vpn.txt");
}

#[tokio::test]
async fn slow_generation_times_out_as_generation_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = desk(tmp.path(), VPN_KB, Arc::new(SlowGenerator(Duration::from_secs(5))))
        .with_generation_timeout(Duration::from_millis(50));

    let answer = desk.ask("How do I connect to the VPN?").await.unwrap();

    assert_eq!(answer.status, AnswerStatus::GenerationFailed(GenerationError::Timeout(Duration::from_millis(50))));
}

#[tokio::test]
async fn query_embedder_must_match_the_index_model() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = Arc::new(GroundedGenerator::it_helpdesk());
    let built = desk(tmp.path(), VPN_KB, generator.clone());
    let other = ServiceDesk::new(
        Arc::new(IndexHandle::new(built.index().current().as_ref().clone())),
        Arc::new(HashEmbedder::new(128)),
        generator.clone(),
    );

    let err = other.ask("connect to the VPN").await.unwrap_err();

    assert!(matches!(err, Error::ModelMismatch { .. }), "got {err:?}");
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn blank_question_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = Arc::new(GroundedGenerator::it_helpdesk());
    let desk = desk(tmp.path(), VPN_KB, generator.clone());

    let err = desk.ask("   ").await.unwrap_err();

    assert!(matches!(err, Error::EmptyQuestion));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn concurrent_questions_share_one_index() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = Arc::new(desk(tmp.path(), HELPDESK_KB, Arc::new(GroundedGenerator::it_helpdesk())));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let desk = Arc::clone(&desk);
        let q = if i % 2 == 0 { "connect to VPN" } else { "add a printer" };
        tasks.push(tokio::spawn(async move { (q, desk.ask(q).await.unwrap()) }));
    }
    for task in tasks {
        let (q, answer) = task.await.unwrap();
        let expected = if q.contains("VPN") { "vpn.txt" } else { "printer.txt" };
        assert_eq!(answer.citation.source_name(), Some(expected));
    }
}
