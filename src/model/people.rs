use crate::{domain::{image::{ImagePage, ImageQuery}, people::{PeopleQuery, Person, PersonForAdd, PersonForInsert, PersonForUpdate, PersonResponse}}, tools::log::{log_info, LogServiceType}};

use super::{error::{Error, Result}, ModelController};


/// Trimmed, non empty name.
fn clean_name(name: Option<String>) -> Result<String> {
    let name = name.map(|n| n.trim().to_string()).unwrap_or_default();
    if name.is_empty() {
        Err(Error::NameRequired)
    } else {
        Ok(name)
    }
}

impl ModelController {

	pub async fn get_people(&self, query: PeopleQuery) -> Result<Vec<PersonResponse>> {
		let people = self.store.get_people(query).await?;
		Ok(people.iter().map(PersonResponse::from).collect())
	}

    pub(super) async fn get_person_or_fail(&self, person_id: &str) -> Result<Person> {
        Self::check_id(person_id)?;
        self.store.get_person(person_id).await?.ok_or_else(|| Error::PersonNotFound(person_id.to_string()))
    }

    pub async fn get_person(&self, person_id: &str) -> Result<PersonResponse> {
		let person = self.get_person_or_fail(person_id).await?;
		Ok(PersonResponse::from(&person))
	}

    async fn check_name_available(&self, name: &str, excluding: Option<String>) -> Result<()> {
        if self.store.get_person_by_name(name, excluding).await?.is_some() {
            return Err(Error::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    pub async fn add_person(&self, new_person: PersonForAdd) -> Result<PersonResponse> {
        let name = clean_name(new_person.name)?;
        self.check_name_available(&name, None).await?;
        let insert = PersonForInsert::new(name);
		self.store.add_person(insert.clone()).await?;
        log_info(LogServiceType::Register, format!("Added person {} ({})", insert.name, insert.id));
        self.get_person(&insert.id).await
	}

    pub async fn update_person(&self, person_id: &str, update: PersonForUpdate) -> Result<PersonResponse> {
        let existing = self.get_person_or_fail(person_id).await?;
        let name = match update.name {
            Some(name) => {
                let name = clean_name(Some(name))?;
                self.check_name_available(&name, Some(existing.id.clone())).await?;
                Some(name)
            },
            None => None,
        };
		self.store.update_person(&existing.id, PersonForUpdate { name }).await?;
        self.get_person(&existing.id).await
	}

    /// With `delete_images` every image of the person is deleted (storage included),
    /// otherwise its images are kept and unassigned.
    pub async fn remove_person(&self, person_id: &str, delete_images: bool) -> Result<PersonResponse> {
        let existing = self.get_person_or_fail(person_id).await?;
        if delete_images {
            let images = self.store.get_images(ImageQuery::from_person(&existing.id)).await?;
            for image in images {
                self.storage.delete(&image.storage.reference).await?;
                self.remove_image_record(&image).await?;
            }
            self.store.remove_person(&existing.id).await?;
            log_info(LogServiceType::Register, format!("Removed person {} and its images", existing.id));
        } else {
            let unassigned = self.store.unassign_images_and_remove_person(&existing.id).await?;
            log_info(LogServiceType::Register, format!("Removed person {}, {} images unassigned", existing.id, unassigned));
        }
        Ok(PersonResponse::from(&existing))
	}

    pub async fn get_person_images(&self, person_id: &str, query: ImageQuery) -> Result<(PersonResponse, ImagePage)> {
        let person = self.get_person_or_fail(person_id).await?;
        let page = self.get_image_page(ImageQuery { person: Some(person.id.clone()), ..query }).await?;
        Ok((PersonResponse::from(&person), page))
    }
}
