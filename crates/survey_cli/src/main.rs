//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `survey_core` linkage end to end: open storage, sync sections,
//!   print the result.
//! - Accept an optional JSON config path as the only argument.

use log::info;
use std::error::Error;
use survey_core::db::open_db_with_config;
use survey_core::{
    init_logging, CoreConfig, DesiredSections, Phase, SectionService, SqliteSectionRepository,
    SqliteSurveyRepository, SurveyService,
};

fn main() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(log_config) = &config.log {
        init_logging(log_config)?;
    }

    println!("survey_core version={}", survey_core::core_version());

    let conn = open_db_with_config(&config.db)?;
    let surveys = SurveyService::new(SqliteSurveyRepository::try_new(&conn)?);
    let sections = SectionService::new(SqliteSectionRepository::try_new(&conn)?);

    let survey = surveys.create_survey("smoke survey")?;
    for (phase, title) in [
        (Phase::Screening, "性別"),
        (Phase::Screening, "年齢"),
        (Phase::Main, "満足度"),
    ] {
        sections.create_section(survey.id, phase, title, None)?;
    }

    let desired = DesiredSections::new(["年齢", "居住地"], ["満足度"]);
    let report = sections.sync_sections_with_report(survey.id, &desired)?;
    info!(
        "event=cli_smoke module=cli status=ok survey_id={} sections={}",
        survey.id,
        report.sections.len()
    );

    println!(
        "plan deleted={} created={} reordered={}",
        report.plan.to_delete.len(),
        report.plan.to_create.len(),
        report.plan.to_update_order.len()
    );
    for section in &report.sections {
        println!(
            "{} {} {} id={}",
            section.phase, section.order, section.title, section.id
        );
    }
    Ok(())
}
