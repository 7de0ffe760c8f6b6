//! Drive API wire types and their domain form.

use serde::Deserialize;

/// MIME type Drive uses to mark folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Whether a remote entry is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// Metadata describing a file or folder in Drive.
///
/// Produced transiently by listing; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Opaque unique identifier
    pub id: String,
    pub name: String,
    pub kind: EntryKind,
    /// Containing folder, when Drive reports one
    pub parent_id: Option<String>,
    /// Size in bytes; absent for folders and Google-native documents
    pub size: Option<u64>,
}

impl RemoteEntry {
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// A remote entry together with its depth in a recursive walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub entry: RemoteEntry,
    pub depth: usize,
}

/// Drive API file resource, as listed.
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,

    /// Size in bytes; Drive sends it as a decimal string
    #[serde(default)]
    pub size: Option<String>,

    /// Parent folder ids
    #[serde(default)]
    pub parents: Vec<String>,
}

impl DriveFile {
    pub fn into_entry(self) -> RemoteEntry {
        let kind = if self.mime_type == FOLDER_MIME_TYPE {
            EntryKind::Folder
        } else {
            EntryKind::File
        };
        RemoteEntry {
            kind,
            parent_id: self.parents.into_iter().next(),
            size: self.size.and_then(|s| s.parse().ok()),
            id: self.id,
            name: self.name,
        }
    }
}

/// Drive API files.list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

/// The body of the final response of a completed upload.
#[derive(Debug, Deserialize)]
pub struct UploadedFile {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_resource_becomes_file_entry() {
        let json = r#"{
            "id": "abc123",
            "name": "report.pdf",
            "mimeType": "application/pdf",
            "size": "1024",
            "parents": ["folder1"]
        }"#;

        let entry: RemoteEntry = serde_json::from_str::<DriveFile>(json)
            .unwrap()
            .into_entry();

        assert_eq!(entry.id, "abc123");
        assert_eq!(entry.kind, EntryKind::File);
        assert_eq!(entry.parent_id.as_deref(), Some("folder1"));
        assert_eq!(entry.size, Some(1024));
    }

    #[test]
    fn folder_resource_becomes_folder_entry() {
        let json = r#"{
            "id": "folder123",
            "name": "Documents",
            "mimeType": "application/vnd.google-apps.folder"
        }"#;

        let entry: RemoteEntry = serde_json::from_str::<DriveFile>(json)
            .unwrap()
            .into_entry();

        assert!(entry.is_folder());
        assert_eq!(entry.parent_id, None);
        assert_eq!(entry.size, None);
    }

    #[test]
    fn list_response_deserializes_with_page_token() {
        let json = r#"{
            "files": [
                {"id": "f1", "name": "a.txt", "mimeType": "text/plain"}
            ],
            "nextPageToken": "token123"
        }"#;

        let response: FilesListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.files.len(), 1);
        assert_eq!(response.next_page_token.as_deref(), Some("token123"));
    }

    #[test]
    fn empty_list_response_deserializes() {
        let response: FilesListResponse = serde_json::from_str("{}").unwrap();
        assert!(response.files.is_empty());
        assert!(response.next_page_token.is_none());
    }
}
