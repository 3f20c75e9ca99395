//! Relational backup adapters
//!
//! Rusqlite-backed implementations of the source traits over the two sqlite
//! stores found inside a mobile device backup: the message store (messages,
//! handles, chats and their join tables) and the address book store. Paths
//! are supplied by the caller; locating backups on a machine is out of
//! scope.

use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{MergeError, Result};
use crate::models::{ContactRecord, RawMessage};
use crate::sources::{ContactDirectory, MessageSource, ParticipantResolver};

/// Read-only view over the message store of a device backup.
///
/// Serves both as the [`MessageSource`] and as the [`ParticipantResolver`]:
/// messages, chat membership and handles all live in the same file.
pub struct MessageStore {
    conn: Connection,
}

impl MessageStore {
    /// Open the message store read-only and verify it is readable.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        probe_readable(&conn, path)?;
        Ok(Self { conn })
    }
}

impl MessageSource for MessageStore {
    fn messages(&self) -> Result<Vec<RawMessage>> {
        // Timestamps are stored against the Apple epoch, 31 years after the
        // unix epoch. Rows without a date are structurally invalid and
        // filtered here rather than in the engine.
        let mut statement = self.conn.prepare(
            "SELECT message.ROWID, message.text, \
                    DATETIME(message.date, 'unixepoch', '31 years') AS date, \
                    message.is_from_me, chat_message_join.chat_id, handle.id \
             FROM message \
             JOIN chat_message_join ON chat_message_join.message_id = message.ROWID \
             LEFT JOIN handle ON handle.ROWID = message.handle_id \
             WHERE message.date IS NOT NULL",
        )?;

        let rows = statement.query_map([], |row| {
            Ok(RawMessage {
                message_id: row.get(0)?,
                text: row.get(1)?,
                date: row.get(2)?,
                is_from_me: row.get(3)?,
                thread_id: row.get::<_, i64>(4)?.to_string(),
                sender: row.get(5)?,
            })
        })?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }

        debug!(count = messages.len(), "loaded message rows from backup");
        Ok(messages)
    }
}

impl ParticipantResolver for MessageStore {
    fn participants_for_thread(&self, thread_id: &str) -> Result<BTreeSet<String>> {
        let chat_id: i64 = thread_id.parse().map_err(|_| {
            MergeError::Precondition(format!("thread id {thread_id} is not a chat row id"))
        })?;

        let mut statement = self.conn.prepare(
            "SELECT handle.id \
             FROM chat_handle_join \
             JOIN handle ON handle.ROWID = chat_handle_join.handle_id \
             WHERE chat_handle_join.chat_id = ?1",
        )?;

        let rows = statement.query_map([chat_id], |row| row.get::<_, String>(0))?;
        let mut participants = BTreeSet::new();
        for row in rows {
            participants.insert(row?);
        }

        Ok(participants)
    }
}

/// Read-only view over the address book store of a device backup.
pub struct AddressBook {
    conn: Connection,
}

impl AddressBook {
    /// Open the address book store read-only and verify it is readable.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        probe_readable(&conn, path)?;
        Ok(Self { conn })
    }
}

impl ContactDirectory for AddressBook {
    fn contacts(&self) -> Result<Vec<ContactRecord>> {
        // Multi-value property 3 is a phone number, 4 an email; other
        // property kinds are not identifiers.
        let mut statement = self.conn.prepare(
            "SELECT ABMultiValue.value, ABPerson.First, ABPerson.Last, ABPerson.Organization, \
                    DATETIME(ABPerson.Birthday, 'unixepoch', '31 years'), \
                    DATETIME(ABPerson.CreationDate, 'unixepoch', '31 years'), \
                    DATETIME(ABPerson.ModificationDate, 'unixepoch', '31 years') \
             FROM ABPerson \
             JOIN ABMultiValue ON ABPerson.ROWID = ABMultiValue.record_id \
             WHERE ABMultiValue.property IN (3, 4) AND ABMultiValue.value IS NOT NULL",
        )?;

        let rows = statement.query_map([], |row| {
            Ok(ContactRecord {
                identifier: row.get(0)?,
                first: row.get(1)?,
                last: row.get(2)?,
                organization: row.get(3)?,
                birthday: row.get(4)?,
                created: row.get(5)?,
                modified: row.get(6)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        debug!(count = records.len(), "loaded contact records from backup");
        Ok(records)
    }
}

/// Probe one table listing to tell unreadable (typically encrypted) stores
/// apart from plain query failures. Either every table is readable or none
/// is, so a single probe suffices.
fn probe_readable(conn: &Connection, path: &Path) -> Result<()> {
    let unreadable = |_| MergeError::EncryptedBackup(path.display().to_string());

    let mut statement = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
        .map_err(unreadable)?;
    let mut rows = statement.query([]).map_err(unreadable)?;
    rows.next().map_err(unreadable)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use std::fs;
    use tempfile::tempdir;

    fn message_fixture(path: &Path) {
        let conn = Connection::open(path).expect("fixture store opens");
        conn.execute_batch(
            "CREATE TABLE message (
                 ROWID INTEGER PRIMARY KEY,
                 text TEXT,
                 date INTEGER,
                 is_from_me INTEGER,
                 handle_id INTEGER
             );
             CREATE TABLE handle (ROWID INTEGER PRIMARY KEY, id TEXT);
             CREATE TABLE chat_message_join (chat_id INTEGER, message_id INTEGER);
             CREATE TABLE chat_handle_join (chat_id INTEGER, handle_id INTEGER);

             INSERT INTO handle VALUES (1, '+1 (415) 555-0100');
             INSERT INTO handle VALUES (2, 'a@b.com');
             INSERT INTO message VALUES (1, 'hello', 0, 0, 1);
             INSERT INTO message VALUES (2, 'hi back', 60, 1, NULL);
             INSERT INTO message VALUES (3, 'dateless', NULL, 0, 1);
             INSERT INTO chat_message_join VALUES (7, 1);
             INSERT INTO chat_message_join VALUES (7, 2);
             INSERT INTO chat_handle_join VALUES (7, 1);
             INSERT INTO chat_handle_join VALUES (7, 2);",
        )
        .expect("fixture rows insert");
    }

    fn address_fixture(path: &Path) {
        let conn = Connection::open(path).expect("fixture store opens");
        conn.execute_batch(
            "CREATE TABLE ABPerson (
                 ROWID INTEGER PRIMARY KEY,
                 First TEXT,
                 Last TEXT,
                 Organization TEXT,
                 Birthday INTEGER,
                 CreationDate INTEGER,
                 ModificationDate INTEGER
             );
             CREATE TABLE ABMultiValue (record_id INTEGER, property INTEGER, value TEXT);

             INSERT INTO ABPerson VALUES (1, 'Jane', 'Doe', NULL, NULL, 0, 0);
             INSERT INTO ABMultiValue VALUES (1, 3, '+1 (415) 555-0100');
             INSERT INTO ABMultiValue VALUES (1, 4, 'jane@doe.com');
             INSERT INTO ABMultiValue VALUES (1, 22, 'https://doe.com');",
        )
        .expect("fixture rows insert");
    }

    #[test]
    fn messages_are_loaded_with_thread_and_sender() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("messages.db");
        message_fixture(&path);

        let store = MessageStore::open(&path).expect("store opens");
        let messages = store.messages().expect("messages load");

        // The dateless row is filtered by the adapter.
        assert_eq!(messages.len(), 2);

        let inbound = messages
            .iter()
            .find(|m| m.message_id == 1)
            .expect("inbound row present");
        assert_eq!(inbound.text.as_deref(), Some("hello"));
        assert_eq!(inbound.thread_id, "7");
        assert_eq!(inbound.sender.as_deref(), Some("+1 (415) 555-0100"));
        assert!(!inbound.is_from_me);
        // The Apple epoch starts 31 years after the unix epoch.
        assert_eq!(inbound.date.year(), 2001);

        let outbound = messages
            .iter()
            .find(|m| m.message_id == 2)
            .expect("outbound row present");
        assert!(outbound.is_from_me);
        assert!(outbound.sender.is_none());
    }

    #[test]
    fn participants_come_from_the_chat_handle_join() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("messages.db");
        message_fixture(&path);

        let store = MessageStore::open(&path).expect("store opens");
        let participants = store.participants_for_thread("7").expect("participants load");

        assert_eq!(participants.len(), 2);
        assert!(participants.contains("+1 (415) 555-0100"));
        assert!(participants.contains("a@b.com"));

        let empty = store.participants_for_thread("99").expect("unknown chat is empty");
        assert!(empty.is_empty());
    }

    #[test]
    fn non_numeric_thread_id_is_a_precondition_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("messages.db");
        message_fixture(&path);

        let store = MessageStore::open(&path).expect("store opens");
        assert!(matches!(
            store.participants_for_thread("chat-7"),
            Err(MergeError::Precondition(_))
        ));
    }

    #[test]
    fn contacts_keep_only_phone_and_email_properties() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("addresses.db");
        address_fixture(&path);

        let book = AddressBook::open(&path).expect("book opens");
        let records = book.contacts().expect("contacts load");

        // The URL property is not an identifier.
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.first.as_deref(), Some("Jane"));
            assert_eq!(record.last.as_deref(), Some("Doe"));
            assert!(record.organization.is_none());
            assert!(record.birthday.is_none());
            assert!(record.created.is_some());
        }
    }

    #[test]
    fn unreadable_store_is_reported_as_encrypted() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("garbage.db");
        fs::write(&path, b"this is not a sqlite database, not even close").expect("fixture writes");

        assert!(matches!(
            MessageStore::open(&path),
            Err(MergeError::EncryptedBackup(_))
        ));
    }
}
