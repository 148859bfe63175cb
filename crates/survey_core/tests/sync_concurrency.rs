use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use survey_core::db::open_db;
use survey_core::{
    DesiredSections, Phase, SectionService, SqliteSectionRepository, SqliteSurveyRepository,
    SurveyId, SurveyService,
};

const WORKERS: usize = 4;
const ROUNDS: usize = 5;

fn seed_survey(path: &Path) -> SurveyId {
    let conn = open_db(path).unwrap();
    let surveys = SurveyService::new(SqliteSurveyRepository::try_new(&conn).unwrap());
    surveys.create_survey("concurrent").unwrap().id
}

fn run_sync(path: &Path, survey_id: SurveyId, desired: &DesiredSections) {
    let conn = open_db(path).unwrap();
    let service = SectionService::new(SqliteSectionRepository::try_new(&conn).unwrap());
    service.sync_sections(survey_id, desired).unwrap();
}

fn final_layout(path: &Path, survey_id: SurveyId) -> Vec<(Phase, String, i64)> {
    let conn = open_db(path).unwrap();
    let service = SectionService::new(SqliteSectionRepository::try_new(&conn).unwrap());
    service
        .list_sections(survey_id)
        .unwrap()
        .into_iter()
        .map(|section| (section.phase, section.title, section.order))
        .collect()
}

fn expected_layout(desired: &DesiredSections) -> Vec<(Phase, String, i64)> {
    Phase::ALL
        .into_iter()
        .flat_map(|phase| {
            desired
                .titles(phase)
                .iter()
                .enumerate()
                .map(move |(index, title)| (phase, title.clone(), index as i64 + 1))
        })
        .collect()
}

#[test]
fn concurrent_syncs_of_one_survey_end_in_one_desired_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = Arc::new(dir.path().join("survey.db"));
    let survey_id = seed_survey(&path);

    let variants = Arc::new([
        DesiredSections::new(["Gender", "Age", "Region"], ["Satisfaction", "NPS"]),
        DesiredSections::new(["Region", "Age"], ["NPS", "Comments", "Satisfaction"]),
    ]);
    let barrier = Arc::new(Barrier::new(WORKERS));

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let path = Arc::clone(&path);
            let variants = Arc::clone(&variants);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..ROUNDS {
                    let desired = &variants[(worker + round) % variants.len()];
                    run_sync(&path, survey_id, desired);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let layout = final_layout(&path, survey_id);
    assert!(
        variants
            .iter()
            .any(|desired| layout == expected_layout(desired)),
        "final layout {layout:?} matches no desired variant"
    );
}

#[test]
fn concurrent_syncs_of_different_surveys_do_not_interfere() {
    let dir = tempfile::tempdir().unwrap();
    let path = Arc::new(dir.path().join("survey.db"));
    let surveys: Vec<SurveyId> = (0..WORKERS).map(|_| seed_survey(&path)).collect();

    let handles: Vec<_> = surveys
        .iter()
        .copied()
        .enumerate()
        .map(|(worker, survey_id)| {
            let path = Arc::clone(&path);
            thread::spawn(move || {
                let screening: Vec<String> =
                    (0..=worker).map(|index| format!("S{worker}-{index}")).collect();
                let desired = DesiredSections::new(screening, vec![format!("M{worker}")]);
                for _ in 0..ROUNDS {
                    run_sync(&path, survey_id, &desired);
                }
                desired
            })
        })
        .collect();

    for (handle, survey_id) in handles.into_iter().zip(surveys) {
        let desired = handle.join().unwrap();
        assert_eq!(final_layout(&path, survey_id), expected_layout(&desired));
    }
}
