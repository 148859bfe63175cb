use std::cell::{Cell, RefCell};
use survey_core::{
    NewSection, Phase, Section, SectionId, SectionRepoError, SectionRepoResult, SectionRepository,
    SurveyId,
};

#[derive(Debug, Clone, Default)]
struct FakeState {
    surveys: Vec<SurveyId>,
    sections: Vec<Section>,
    last_id: SectionId,
}

/// In-memory section gateway.
///
/// Enforces `(survey_id, phase, order)` uniqueness on every write, refuses
/// writes outside a unit of work, and restores its snapshot when a unit of
/// work fails.
#[derive(Debug, Default)]
pub struct FakeSectionRepository {
    state: RefCell<FakeState>,
    in_unit_of_work: Cell<bool>,
    calls: Cell<usize>,
    mutations: Cell<usize>,
    order_updates: Cell<usize>,
    fail_on_order_update: Cell<Option<usize>>,
}

impl FakeSectionRepository {
    pub fn with_survey(survey_id: SurveyId) -> Self {
        let repo = Self::default();
        repo.state.borrow_mut().surveys.push(survey_id);
        repo
    }

    /// Inserts a row directly, bypassing counters and constraints.
    pub fn seed(&self, survey_id: SurveyId, phase: Phase, title: &str, order: i64) -> SectionId {
        let mut state = self.state.borrow_mut();
        state.last_id += 1;
        let id = state.last_id;
        state.sections.push(Section {
            id,
            survey_id,
            phase,
            title: title.to_string(),
            order,
            created_at: 0,
            updated_at: 0,
        });
        id
    }

    pub fn snapshot(&self, survey_id: SurveyId) -> Vec<Section> {
        sorted(&self.state.borrow().sections, survey_id)
    }

    /// Number of gateway calls of any kind.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Number of create/delete/update calls.
    pub fn mutations(&self) -> usize {
        self.mutations.get()
    }

    /// Makes the `nth` (1-based, counted from now) order update fail.
    pub fn fail_on_order_update(&self, nth: Option<usize>) {
        self.order_updates.set(0);
        self.fail_on_order_update.set(nth);
    }

    fn record_call(&self, mutating: bool) {
        self.calls.set(self.calls.get() + 1);
        if mutating {
            assert!(
                self.in_unit_of_work.get(),
                "mutation issued outside a unit of work"
            );
            self.mutations.set(self.mutations.get() + 1);
        }
    }
}

fn sorted(sections: &[Section], survey_id: SurveyId) -> Vec<Section> {
    let mut result: Vec<Section> = sections
        .iter()
        .filter(|section| section.survey_id == survey_id)
        .cloned()
        .collect();
    result.sort_by_key(|section| (section.phase, section.order, section.id));
    result
}

fn ensure_slot_free(
    sections: &[Section],
    survey_id: SurveyId,
    phase: Phase,
    order: i64,
    except: Option<SectionId>,
) -> SectionRepoResult<()> {
    let taken = sections.iter().any(|section| {
        Some(section.id) != except
            && section.survey_id == survey_id
            && section.phase == phase
            && section.order == order
    });
    if taken {
        return Err(SectionRepoError::OrderTaken {
            survey_id,
            phase,
            order,
        });
    }
    Ok(())
}

impl SectionRepository for FakeSectionRepository {
    fn survey_exists(&self, survey_id: SurveyId) -> SectionRepoResult<bool> {
        self.record_call(false);
        Ok(self.state.borrow().surveys.contains(&survey_id))
    }

    fn list_sections(&self, survey_id: SurveyId) -> SectionRepoResult<Vec<Section>> {
        self.record_call(false);
        Ok(self.snapshot(survey_id))
    }

    fn get_section(&self, id: SectionId) -> SectionRepoResult<Option<Section>> {
        self.record_call(false);
        Ok(self
            .state
            .borrow()
            .sections
            .iter()
            .find(|section| section.id == id)
            .cloned())
    }

    fn create_sections(&self, sections: &[NewSection]) -> SectionRepoResult<Vec<Section>> {
        self.record_call(true);
        let mut state = self.state.borrow_mut();
        let mut created = Vec::new();
        for new_section in sections {
            ensure_slot_free(
                &state.sections,
                new_section.survey_id,
                new_section.phase,
                new_section.order,
                None,
            )?;
            state.last_id += 1;
            let section = Section {
                id: state.last_id,
                survey_id: new_section.survey_id,
                phase: new_section.phase,
                title: new_section.title.clone(),
                order: new_section.order,
                created_at: 1,
                updated_at: 1,
            };
            state.sections.push(section.clone());
            created.push(section);
        }
        Ok(created)
    }

    fn delete_sections(&self, ids: &[SectionId]) -> SectionRepoResult<()> {
        self.record_call(true);
        let mut state = self.state.borrow_mut();
        for id in ids {
            let position = state
                .sections
                .iter()
                .position(|section| section.id == *id)
                .ok_or(SectionRepoError::SectionNotFound(*id))?;
            state.sections.remove(position);
        }
        Ok(())
    }

    fn update_section_order(&self, id: SectionId, order: i64) -> SectionRepoResult<()> {
        self.record_call(true);
        let attempt = self.order_updates.get() + 1;
        self.order_updates.set(attempt);
        if self.fail_on_order_update.get() == Some(attempt) {
            return Err(SectionRepoError::InvalidData(
                "injected order update failure".to_string(),
            ));
        }

        let mut state = self.state.borrow_mut();
        let (survey_id, phase) = state
            .sections
            .iter()
            .find(|section| section.id == id)
            .map(|section| (section.survey_id, section.phase))
            .ok_or(SectionRepoError::SectionNotFound(id))?;
        ensure_slot_free(&state.sections, survey_id, phase, order, Some(id))?;
        if let Some(section) = state.sections.iter_mut().find(|section| section.id == id) {
            section.order = order;
            section.updated_at += 1;
        }
        Ok(())
    }

    fn update_section(&self, id: SectionId, title: &str, order: i64) -> SectionRepoResult<()> {
        self.record_call(true);
        let mut state = self.state.borrow_mut();
        let (survey_id, phase) = state
            .sections
            .iter()
            .find(|section| section.id == id)
            .map(|section| (section.survey_id, section.phase))
            .ok_or(SectionRepoError::SectionNotFound(id))?;
        ensure_slot_free(&state.sections, survey_id, phase, order, Some(id))?;
        if let Some(section) = state.sections.iter_mut().find(|section| section.id == id) {
            section.title = title.to_string();
            section.order = order;
            section.updated_at += 1;
        }
        Ok(())
    }

    fn unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<SectionRepoError>,
    {
        assert!(
            !self.in_unit_of_work.replace(true),
            "unit of work must not be nested"
        );
        let before = self.state.borrow().clone();
        let result = work(self);
        self.in_unit_of_work.set(false);
        if result.is_err() {
            *self.state.borrow_mut() = before;
        }
        result
    }
}
