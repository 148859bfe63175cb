mod common;

use common::FakeSectionRepository;
use survey_core::{DesiredSections, ErrorKind, Phase, Section, SectionService, SectionServiceError};

const SURVEY: i64 = 1;

fn layout(sections: &[Section]) -> Vec<(Phase, &str, i64)> {
    sections
        .iter()
        .map(|section| (section.phase, section.title.as_str(), section.order))
        .collect()
}

#[test]
fn sync_applies_plan_against_any_gateway() {
    let repo = FakeSectionRepository::with_survey(SURVEY);
    let gender = repo.seed(SURVEY, Phase::Screening, "性別", 1);
    let age = repo.seed(SURVEY, Phase::Screening, "年齢", 2);
    repo.seed(SURVEY, Phase::Main, "満足度", 1);
    let service = SectionService::new(repo);

    let desired = DesiredSections::new(["年齢", "居住地"], ["満足度"]);
    let report = service
        .sync_sections_with_report(SURVEY, &desired)
        .unwrap();

    assert_eq!(report.plan.to_delete, vec![gender]);
    assert_eq!(
        layout(&report.sections),
        vec![
            (Phase::Screening, "年齢", 1),
            (Phase::Screening, "居住地", 2),
            (Phase::Main, "満足度", 1),
        ]
    );
    assert_eq!(report.sections[0].id, age);
}

#[test]
fn swapping_two_sections_never_collides_on_order() {
    let repo = FakeSectionRepository::with_survey(SURVEY);
    let a = repo.seed(SURVEY, Phase::Main, "A", 1);
    let b = repo.seed(SURVEY, Phase::Main, "B", 2);
    let service = SectionService::new(&repo);

    let sections = service
        .sync_sections(SURVEY, &DesiredSections::new([], ["B", "A"]))
        .unwrap();

    assert_eq!(
        layout(&sections),
        vec![(Phase::Main, "B", 1), (Phase::Main, "A", 2)]
    );
    assert_eq!(sections[0].id, b);
    assert_eq!(sections[1].id, a);
}

#[test]
fn converged_survey_issues_no_mutations() {
    let repo = FakeSectionRepository::with_survey(SURVEY);
    let service = SectionService::new(&repo);
    let desired = DesiredSections::new(["S"], ["M1", "M2"]);

    service.sync_sections(SURVEY, &desired).unwrap();
    let mutations_after_first = repo.mutations();
    let report = service
        .sync_sections_with_report(SURVEY, &desired)
        .unwrap();

    assert!(report.plan.is_empty());
    assert_eq!(repo.mutations(), mutations_after_first);
}

#[test]
fn failure_in_final_step_restores_initial_state() {
    let repo = FakeSectionRepository::with_survey(SURVEY);
    repo.seed(SURVEY, Phase::Screening, "drop me", 1);
    repo.seed(SURVEY, Phase::Screening, "A", 2);
    repo.seed(SURVEY, Phase::Screening, "B", 3);
    let before = repo.snapshot(SURVEY);
    let service = SectionService::new(&repo);

    // B and A both move: two parks, then the first final order write fails.
    repo.fail_on_order_update(Some(3));
    let desired = DesiredSections::new(["B", "new", "A"], []);
    let err = service.sync_sections(SURVEY, &desired).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(repo.snapshot(SURVEY), before);

    repo.fail_on_order_update(None);
    let sections = service.sync_sections(SURVEY, &desired).unwrap();
    assert_eq!(
        layout(&sections),
        vec![
            (Phase::Screening, "B", 1),
            (Phase::Screening, "new", 2),
            (Phase::Screening, "A", 3),
        ]
    );
}

#[test]
fn validation_errors_touch_no_gateway_method() {
    let repo = FakeSectionRepository::with_survey(SURVEY);
    let service = SectionService::new(&repo);

    let blank = service
        .sync_sections(SURVEY, &DesiredSections::new([""], []))
        .unwrap_err();
    let duplicate = service
        .sync_sections(SURVEY, &DesiredSections::new([], ["X", "X"]))
        .unwrap_err();
    let bad_id = service
        .sync_sections(0, &DesiredSections::default())
        .unwrap_err();

    assert_eq!(blank.kind(), ErrorKind::Validation);
    assert_eq!(duplicate.kind(), ErrorKind::Conflict);
    assert_eq!(bad_id.kind(), ErrorKind::Validation);
    assert_eq!(repo.calls(), 0);
}

#[test]
fn unknown_survey_fails_before_any_mutation() {
    let repo = FakeSectionRepository::with_survey(SURVEY);
    let service = SectionService::new(&repo);

    let err = service
        .sync_sections(SURVEY + 1, &DesiredSections::new(["A"], []))
        .unwrap_err();

    assert!(matches!(err, SectionServiceError::SurveyNotFound(2)));
    assert_eq!(repo.mutations(), 0);
}

#[test]
fn duplicate_persisted_keys_collapse_to_one_row() {
    let repo = FakeSectionRepository::with_survey(SURVEY);
    repo.seed(SURVEY, Phase::Main, "Twin", 1);
    let kept = repo.seed(SURVEY, Phase::Main, "Twin", 2);
    let service = SectionService::new(&repo);

    let sections = service
        .sync_sections(SURVEY, &DesiredSections::new([], ["Twin"]))
        .unwrap();

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].id, kept);
    assert_eq!(sections[0].order, 1);
}

#[test]
fn preview_uses_reads_only() {
    let repo = FakeSectionRepository::with_survey(SURVEY);
    repo.seed(SURVEY, Phase::Main, "old", 1);
    let service = SectionService::new(&repo);

    let plan = service
        .preview_sync(SURVEY, &DesiredSections::new([], ["new"]))
        .unwrap();

    assert_eq!(plan.to_delete.len(), 1);
    assert_eq!(plan.to_create.len(), 1);
    assert_eq!(repo.mutations(), 0);
}
