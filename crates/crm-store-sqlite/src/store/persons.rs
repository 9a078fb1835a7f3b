use chrono::Utc;
use crm_core::{
  person::{Person, PersonInput},
  store::{ListQuery, Page, PersonRepository},
};

use super::SqliteStore;
use crate::{
  Error, Result,
  encode::{PERSON_COLUMNS, RawPerson, encode_dt, encode_json},
};

impl PersonRepository for SqliteStore {
  async fn list_persons(&self, query: ListQuery) -> Result<Page<Person>> {
    let (raws, total) = self
      .page("persons", PERSON_COLUMNS, None, query, RawPerson::from_row)
      .await?;
    let items = raws.into_iter().map(RawPerson::into_person).collect::<Result<_>>()?;
    Ok(Page { items, total })
  }

  async fn search_persons(&self, term: String) -> Result<Vec<Person>> {
    let pattern = format!("%{term}%");

    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS} FROM persons WHERE name LIKE ?1 ORDER BY id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn get_person(&self, id: i64) -> Result<Option<Person>> {
    self
      .by_id("persons", PERSON_COLUMNS, id, RawPerson::from_row)
      .await?
      .map(RawPerson::into_person)
      .transpose()
  }

  async fn create_person(&self, input: PersonInput) -> Result<Person> {
    let now             = Utc::now();
    let now_str         = encode_dt(now);
    let emails          = encode_json(&input.emails)?;
    let contact_numbers = encode_json(&input.contact_numbers)?;
    let name            = input.name.clone();
    let job_title       = input.job_title.clone();
    let organization_id = input.organization_id;

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO persons
             (name, emails, contact_numbers, job_title, organization_id, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![name, emails, contact_numbers, job_title, organization_id, now_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Person {
      id,
      name:            input.name,
      emails:          input.emails,
      contact_numbers: input.contact_numbers,
      job_title:       input.job_title,
      organization_id: input.organization_id,
      created_at:      now,
      updated_at:      now,
    })
  }

  async fn update_person(&self, id: i64, input: PersonInput) -> Result<Option<Person>> {
    let now_str         = encode_dt(Utc::now());
    let emails          = encode_json(&input.emails)?;
    let contact_numbers = encode_json(&input.contact_numbers)?;

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE persons
           SET name = ?2, emails = ?3, contact_numbers = ?4, job_title = ?5,
               organization_id = ?6, updated_at = ?7
           WHERE id = ?1",
          rusqlite::params![
            id,
            input.name,
            emails,
            contact_numbers,
            input.job_title,
            input.organization_id,
            now_str,
          ],
        )?)
      })
      .await?;

    if affected == 0 {
      return Ok(None);
    }
    self
      .get_person(id)
      .await?
      .ok_or(Error::Vanished { table: "persons", id })
      .map(Some)
  }

  async fn delete_person(&self, id: i64) -> Result<bool> {
    self.delete_by_id("persons", id).await
  }
}
