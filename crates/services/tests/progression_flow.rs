use std::sync::Arc;

use course_core::model::{
    Catalog, GateRejection, Lesson, LessonContent, LessonId, Ordinal, Question, QuestionSet,
    SubmitOutcome,
};
use course_core::reachability::Reachability;
use course_core::time::fixed_now;
use services::{
    AppServices, Clock, LessonCompletion, LessonFlowError, ProgressStore, ProgressStoreError,
};
use storage::repository::Storage;

fn ord(n: u32) -> Ordinal {
    Ordinal::try_new(n).unwrap()
}

fn quiz(correct: &[usize]) -> QuestionSet {
    QuestionSet::new(
        correct
            .iter()
            .map(|&correct_index| Question {
                prompt: "Pick one".into(),
                options: vec!["a".into(), "b".into(), "c".into()],
                correct_index,
                explanation: Some("Review the last step.".into()),
            })
            .collect(),
    )
}

/// Three lessons; the second is gated by a five-question quiz.
fn catalog() -> Catalog {
    Catalog::new(vec![
        Lesson {
            id: LessonId::new(101),
            ordinal: ord(1),
            title: "Ownership".into(),
            content: LessonContent::Simple { steps: 2 },
        },
        Lesson {
            id: LessonId::new(205),
            ordinal: ord(2),
            title: "Borrowing".into(),
            content: LessonContent::QuizGated {
                steps: 3,
                quiz: quiz(&[0, 1, 2, 0, 0]),
            },
        },
        Lesson {
            id: LessonId::new(309),
            ordinal: ord(3),
            title: "Lifetimes".into(),
            content: LessonContent::Simple { steps: 1 },
        },
    ])
    .unwrap()
}

async fn sqlite_app(name: &str) -> AppServices {
    AppServices::new_sqlite(
        &format!("sqlite:file:{name}?mode=memory&cache=shared"),
        catalog(),
        Clock::fixed(fixed_now()),
    )
    .await
}

fn statuses(app: &AppServices) -> Vec<Reachability> {
    app.progress()
        .reachability(&app.catalog())
        .into_values()
        .collect()
}

#[tokio::test]
async fn fresh_course_unlocks_only_first_lesson() {
    let app = sqlite_app("memdb_flow_fresh").await;
    assert_eq!(
        statuses(&app),
        vec![
            Reachability::Current,
            Reachability::Locked,
            Reachability::Locked
        ]
    );

    let err = app
        .lessons()
        .open_lesson(app.progress(), ord(2))
        .unwrap_err();
    assert!(matches!(err, LessonFlowError::Locked(o) if o == ord(2)));
    assert!(matches!(
        app.lessons().open_lesson(app.progress(), ord(9)),
        Err(LessonFlowError::UnknownLesson(_))
    ));
}

#[tokio::test]
async fn completing_simple_lesson_advances_current() {
    let mut app = sqlite_app("memdb_flow_simple").await;
    let lessons = app.lessons();

    let mut session = lessons.open_lesson(app.progress(), ord(1)).unwrap();
    assert_eq!(
        lessons
            .complete_lesson(app.progress_mut(), &mut session)
            .await
            .unwrap(),
        LessonCompletion::Rejected(GateRejection::NotOnFinalStep {
            current: 1,
            total: 2
        })
    );

    session.next().unwrap();
    let completion = lessons
        .complete_lesson(app.progress_mut(), &mut session)
        .await
        .unwrap();
    assert!(matches!(completion, LessonCompletion::Recorded(event) if event.ordinal == ord(1)));

    assert_eq!(
        statuses(&app),
        vec![
            Reachability::Completed,
            Reachability::Current,
            Reachability::Locked
        ]
    );
}

#[tokio::test]
async fn failed_quiz_leaves_progress_unchanged() {
    let mut app = sqlite_app("memdb_flow_failed_quiz").await;
    let lessons = app.lessons();
    app.progress_mut().mark_completed(ord(1)).await.unwrap();
    let before = app.progress().snapshot().clone();

    let mut session = lessons.open_lesson(app.progress(), ord(2)).unwrap();
    while session.next().unwrap() != course_core::model::StepMove::AtBoundary {}
    for question in 0..5 {
        session.answer(question, 2).unwrap();
    }
    let SubmitOutcome::Scored(outcome) = session.submit_quiz().unwrap() else {
        panic!("all questions answered");
    };
    assert!(!outcome.passed());

    let completion = lessons
        .complete_lesson(app.progress_mut(), &mut session)
        .await
        .unwrap();
    assert_eq!(
        completion,
        LessonCompletion::Rejected(GateRejection::QuizNotPassed)
    );
    assert_eq!(app.progress().snapshot(), &before);
}

#[tokio::test]
async fn passing_quiz_with_four_of_five_completes_lesson() {
    let mut app = sqlite_app("memdb_flow_passed_quiz").await;
    let lessons = app.lessons();
    app.progress_mut().mark_completed(ord(1)).await.unwrap();

    let mut session = lessons.open_lesson(app.progress(), ord(2)).unwrap();
    session.next().unwrap();
    session.next().unwrap();
    for (question, option) in [0, 1, 2, 1, 0].into_iter().enumerate() {
        session.answer(question, option).unwrap();
    }
    session.submit_quiz().unwrap();

    let completion = lessons
        .complete_lesson(app.progress_mut(), &mut session)
        .await
        .unwrap();
    assert!(matches!(completion, LessonCompletion::Recorded(_)));
    assert!(app.progress().is_completed(ord(2)));
    assert_eq!(
        app.progress().overview(&app.catalog()).current().map(|row| row.ordinal),
        Some(ord(3))
    );
}

#[tokio::test]
async fn reset_clears_everything_and_survives_reload() {
    let storage = Storage::sqlite("sqlite:file:memdb_flow_reset?mode=memory&cache=shared")
        .await
        .expect("connect sqlite");
    let clock = Clock::fixed(fixed_now());

    let mut store = ProgressStore::hydrate(clock, Arc::clone(&storage.progress)).await;
    for n in 1..=3 {
        store.mark_completed(ord(n)).await.unwrap();
    }
    assert!(store.overview(&catalog()).is_finished());

    store.reset().await.unwrap();
    assert!(store.snapshot().is_empty());

    let reloaded = ProgressStore::hydrate(clock, Arc::clone(&storage.progress)).await;
    assert!(reloaded.snapshot().is_empty());
    assert_eq!(
        reloaded.reachability(&catalog()).into_values().collect::<Vec<_>>(),
        vec![
            Reachability::Current,
            Reachability::Locked,
            Reachability::Locked
        ]
    );
}

#[tokio::test]
async fn completed_lessons_can_be_reopened() {
    let storage = Storage::in_memory();
    let mut app = AppServices::from_storage(&storage, catalog(), Clock::fixed(fixed_now())).await;
    app.progress_mut().mark_completed(ord(1)).await.unwrap();

    let session = app.lessons().open_lesson(app.progress(), ord(1)).unwrap();
    assert_eq!(session.current_step(), 1);
}

#[tokio::test]
async fn unopenable_database_starts_fresh_and_reports_saves() {
    let mut app = AppServices::new_sqlite(
        "sqlite:///proc/no_such_dir/course.sqlite3",
        catalog(),
        Clock::fixed(fixed_now()),
    )
    .await;
    assert!(app.progress().snapshot().is_empty());
    assert_eq!(
        statuses(&app),
        vec![
            Reachability::Current,
            Reachability::Locked,
            Reachability::Locked
        ]
    );

    let lessons = app.lessons();
    let mut session = lessons.open_lesson(app.progress(), ord(1)).unwrap();
    session.next().unwrap();
    let err = lessons
        .complete_lesson(app.progress_mut(), &mut session)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LessonFlowError::Progress(ProgressStoreError::Persistence(_))
    ));
    assert!(app.progress().is_completed(ord(1)));
    assert!(app.progress().is_dirty());
}
