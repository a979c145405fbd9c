use crate::{domain::image::Image, tools::log::{log_error, log_info, LogServiceType}};

use super::{error::{Error, Result}, ModelController};

/// Effect of changing the association of one image.
#[derive(Debug, Clone, PartialEq)]
pub enum AssociationChange {
    Associate(String),
    Release(String),
    Move { from: String, to: String },
    Confirm(String),
    Unchanged,
}

impl AssociationChange {
    pub fn plan(old: Option<&str>, new: Option<&str>) -> Self {
        match (old, new) {
            (None, None) => AssociationChange::Unchanged,
            (None, Some(to)) => AssociationChange::Associate(to.to_string()),
            (Some(from), None) => AssociationChange::Release(from.to_string()),
            (Some(from), Some(to)) if from == to => AssociationChange::Confirm(to.to_string()),
            (Some(from), Some(to)) => AssociationChange::Move { from: from.to_string(), to: to.to_string() },
        }
    }
}

impl ModelController {

    /// Points `image` at `new_person` and updates the people on both sides.
    /// The target person must exist.
    pub(super) async fn apply_association(&self, image: &Image, new_person: Option<&str>) -> Result<AssociationChange> {
        let change = AssociationChange::plan(image.person_ref.as_deref(), new_person);
        match &change {
            AssociationChange::Unchanged => {},
            AssociationChange::Confirm(person_id) => {
                self.store.touch_person(person_id).await?;
                self.store.touch_image(&image.id).await?;
                self.learn_from_image(person_id, image).await?;
            },
            AssociationChange::Associate(person_id) => {
                self.claim_image(person_id).await?;
                self.store.set_image_person(&image.id, Some(person_id.clone())).await?;
                self.learn_from_image(person_id, image).await?;
            },
            AssociationChange::Release(person_id) => {
                self.store.set_image_person(&image.id, None).await?;
                self.release_image(person_id).await?;
            },
            AssociationChange::Move { from, to } => {
                self.claim_image(to).await?;
                self.store.set_image_person(&image.id, Some(to.clone())).await?;
                self.release_image(from).await?;
                self.learn_from_image(to, image).await?;
            },
        }
        if change != AssociationChange::Unchanged {
            log_info(LogServiceType::Ledger, format!("Image {}: {:?}", image.id, change));
        }
        Ok(change)
    }

    /// Counts the image for the person before anything points at it, so a
    /// missing person fails with nothing written.
    async fn claim_image(&self, person_id: &str) -> Result<()> {
        if !self.store.increment_person_image_count(person_id).await? {
            return Err(Error::PersonNotFound(person_id.to_string()));
        }
        Ok(())
    }

    /// Adds the first descriptor of the image to the person set and gives the
    /// person a thumbnail when it has none.
    async fn learn_from_image(&self, person_id: &str, image: &Image) -> Result<()> {
        if let Some(descriptor) = image.first_descriptor() {
            self.store.add_person_descriptor(person_id, descriptor).await?;
        }
        let thumbnail = self.storage.thumbnail_url(&image.storage.url);
        self.store.set_person_thumbnail_if_unset(person_id, &thumbnail).await?;
        Ok(())
    }

    pub(super) async fn release_image(&self, person_id: &str) -> Result<()> {
        if !self.store.decrement_person_image_count(person_id).await? {
            log_error(LogServiceType::Ledger, format!("Image count of person {} could not be decremented (missing person or count already 0)", person_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{domain::new_id, model::testing::{add_person, face, person, stored_image, stored_image_from, test_controller}};

    use super::*;

    #[test]
    fn plan_transitions() {
        assert_eq!(AssociationChange::plan(None, None), AssociationChange::Unchanged);
        assert_eq!(AssociationChange::plan(None, Some("b")), AssociationChange::Associate("b".to_string()));
        assert_eq!(AssociationChange::plan(Some("a"), None), AssociationChange::Release("a".to_string()));
        assert_eq!(AssociationChange::plan(Some("a"), Some("a")), AssociationChange::Confirm("a".to_string()));
        assert_eq!(AssociationChange::plan(Some("a"), Some("b")), AssociationChange::Move { from: "a".to_string(), to: "b".to_string() });
    }

    enum Step<'a> {
        Assign(&'a str, Option<&'a str>),
        Reprocess(&'a str),
        RemoveImage(&'a str),
        RemovePerson(&'a str),
    }

    async fn assert_counts_match_images(mc: &ModelController) {
        let people = mc.store.get_people(Default::default()).await.unwrap();
        let images = mc.store.get_images(Default::default()).await.unwrap();
        for p in &people {
            let owned = images.iter().filter(|i| i.person_ref.as_deref() == Some(p.id.as_str())).count() as u64;
            assert_eq!(p.image_count, owned, "count of {}", p.name);
        }
        for image in &images {
            if let Some(person_ref) = &image.person_ref {
                assert!(people.iter().any(|p| &p.id == person_ref), "image {} points to a missing person", image.id);
            }
        }
    }

    #[tokio::test]
    async fn counters_are_conserved_over_a_sequence() {
        let (mc, extractor, _) = test_controller().await;
        let alice = add_person(&mc, "Alice").await;
        let bob = add_person(&mc, "Bob").await;
        let carol = add_person(&mc, "Carol").await;
        let first = stored_image(&mc, vec![face(0.1)]).await;
        let second = stored_image(&mc, vec![face(0.2)]).await;
        let third = stored_image(&mc, vec![]).await;
        let fourth = stored_image_from(&mc, b"fourth", vec![]).await;
        extractor.register(b"fourth", vec![face(0.21)]);

        let script = vec![
            Step::Assign(first.as_str(), Some(alice.as_str())),
            Step::Assign(second.as_str(), Some(alice.as_str())),
            Step::Assign(third.as_str(), Some(bob.as_str())),
            Step::Assign(first.as_str(), Some(bob.as_str())),
            Step::Assign(first.as_str(), Some(bob.as_str())),
            Step::Assign(second.as_str(), None),
            Step::Assign(second.as_str(), None),
            // closest to the descriptor alice learned from `second`
            Step::Reprocess(fourth.as_str()),
            Step::RemoveImage(third.as_str()),
            Step::Assign(fourth.as_str(), Some(carol.as_str())),
            // no face found in the stored binary anymore
            Step::Reprocess(first.as_str()),
            Step::RemovePerson(carol.as_str()),
            Step::Assign(second.as_str(), Some(bob.as_str())),
            Step::RemoveImage(second.as_str()),
        ];
        for step in script {
            match step {
                Step::Assign(image_id, person_id) => { mc.assign_image(image_id, person_id.map(|p| p.to_string())).await.unwrap(); },
                Step::Reprocess(image_id) => { mc.reprocess_image(image_id).await.unwrap(); },
                Step::RemoveImage(image_id) => { mc.remove_image(image_id).await.unwrap(); },
                Step::RemovePerson(person_id) => { mc.remove_person(person_id, false).await.unwrap(); },
            }
            assert_counts_match_images(&mc).await;
        }

        assert_eq!(person(&mc, &alice).await.image_count, 0);
        assert_eq!(person(&mc, &bob).await.image_count, 0);
        assert_eq!(mc.get_image(&first).await.unwrap().person_id, None);
        let fourth = mc.get_image(&fourth).await.unwrap();
        assert_eq!(fourth.person_id, None);
        assert!(fourth.has_face);
    }

    #[tokio::test]
    async fn missing_target_person_writes_nothing() {
        let (mc, _, _) = test_controller().await;
        let alice = add_person(&mc, "Alice").await;
        let assigned = stored_image(&mc, vec![face(0.1)]).await;
        let loose = stored_image(&mc, vec![face(0.2)]).await;
        mc.assign_image(&assigned, Some(alice.clone())).await.unwrap();
        let ghost = new_id();

        let image = mc.store.get_image(&assigned).await.unwrap().unwrap();
        let moved = mc.apply_association(&image, Some(ghost.as_str())).await;
        assert!(matches!(moved, Err(Error::PersonNotFound(_))));
        let image = mc.store.get_image(&assigned).await.unwrap().unwrap();
        assert_eq!(image.person_ref, Some(alice.clone()));
        assert_eq!(person(&mc, &alice).await.image_count, 1);

        let image = mc.store.get_image(&loose).await.unwrap().unwrap();
        let associated = mc.apply_association(&image, Some(ghost.as_str())).await;
        assert!(matches!(associated, Err(Error::PersonNotFound(_))));
        assert_eq!(mc.store.get_image(&loose).await.unwrap().unwrap().person_ref, None);
        assert!(mc.store.get_person(&ghost).await.unwrap().is_none());
        assert_counts_match_images(&mc).await;
    }

    #[tokio::test]
    async fn release_never_goes_negative() {
        let (mc, _, _) = test_controller().await;
        let alice = add_person(&mc, "Alice").await;
        mc.release_image(&alice).await.unwrap();
        assert_eq!(person(&mc, &alice).await.image_count, 0);
    }

    #[tokio::test]
    async fn thumbnail_set_once_and_reconfirmation_is_idempotent() {
        let (mc, _, _) = test_controller().await;
        let alice = add_person(&mc, "Alice").await;
        let first = stored_image(&mc, vec![face(0.1)]).await;
        let second = stored_image(&mc, vec![face(0.9)]).await;

        mc.assign_image(&first, Some(alice.clone())).await.unwrap();
        let after_first = person(&mc, &alice).await;
        let first_url = mc.get_image(&first).await.unwrap().url;
        assert_eq!(after_first.thumbnail, Some(mc.storage.thumbnail_url(&first_url)));

        mc.assign_image(&second, Some(alice.clone())).await.unwrap();
        let after_second = person(&mc, &alice).await;
        assert_eq!(after_second.thumbnail, after_first.thumbnail);
        assert_eq!(after_second.image_count, 2);
        assert_eq!(after_second.descriptors.len(), 2);

        let before = mc.store.get_image(&second).await.unwrap().unwrap().modified;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        mc.assign_image(&second, Some(alice.clone())).await.unwrap();
        mc.assign_image(&second, Some(alice.clone())).await.unwrap();
        let reconfirmed = mc.store.get_image(&second).await.unwrap().unwrap();
        assert!(reconfirmed.modified > before);
        assert_eq!(reconfirmed.person_ref, Some(alice.clone()));
        let confirmed = person(&mc, &alice).await;
        assert_eq!(confirmed.image_count, 2);
        assert_eq!(confirmed.descriptors.len(), 2);
        assert_eq!(confirmed.thumbnail, after_first.thumbnail);
    }

    #[tokio::test]
    async fn reassign_moves_count_and_teaches_target() {
        let (mc, _, _) = test_controller().await;
        let alice = add_person(&mc, "Alice").await;
        let bob = add_person(&mc, "Bob").await;
        let image = stored_image(&mc, vec![face(0.4), face(0.8)]).await;
        mc.assign_image(&image, Some(alice.clone())).await.unwrap();

        mc.assign_image(&image, Some(bob.clone())).await.unwrap();
        let alice_after = person(&mc, &alice).await;
        let bob_after = person(&mc, &bob).await;
        assert_eq!(alice_after.image_count, 0);
        assert_eq!(bob_after.image_count, 1);
        assert_eq!(bob_after.descriptors, vec![face(0.4).descriptor]);
        let image = mc.get_image(&image).await.unwrap();
        assert_eq!(image.person_id, Some(bob));
        assert!(image.is_identified);
    }
}
