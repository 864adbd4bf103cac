//! Query encoding.
//!
//! Service clients describe a request as a [`Query`]; [`encode`] turns it
//! into the [`Payload`] that goes over the wire. Local files named by a
//! [`FileQuery`] are read fully and released before the request is sent.

use std::path::Path;

use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{PipelineError, Result};

/// Name→value mapping of a query.
pub type Fields = Map<String, Value>;

/// Form field that carries the JSON remainder of a multipart request.
pub const JSON_FIELD: &str = "json";

/// Serialize `query` into its field mapping.
pub fn fields<T: Serialize + ?Sized>(query: &T) -> Result<Fields> {
    match serde_json::to_value(query) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(PipelineError::Encoding(format!(
            "expected an object, got {}",
            kind_of(&other)
        ))),
        Err(e) => Err(PipelineError::Encoding(e.to_string())),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A field holding a path to a file that should be uploaded when it exists
/// locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileField {
    /// Key in the query's field mapping.
    pub field: &'static str,
    /// Multipart part name, e.g. `image` or `audio`.
    pub part: &'static str,
}

/// A query whose path fields may become attachments.
#[derive(Clone, Debug, PartialEq)]
pub struct FileQuery {
    pub fields: Fields,
    pub files: Vec<FileField>,
}

/// A query that carries its audio inline.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamQuery {
    pub fields: Fields,
    /// Key of the inline data; blanked in the JSON remainder.
    pub field: &'static str,
    pub part: &'static str,
    pub data: Vec<u8>,
}

/// Wire-level shape of a request, built by a service's encode function.
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    Simple(Fields),
    File(FileQuery),
    Stream(StreamQuery),
}

impl Query {
    /// A plain JSON query from any serializable value.
    pub fn simple<T: Serialize + ?Sized>(query: &T) -> Result<Self> {
        Ok(Query::Simple(fields(query)?))
    }

    /// A query whose `files` are uploaded when they exist locally.
    pub fn file<T: Serialize + ?Sized>(query: &T, files: Vec<FileField>) -> Result<Self> {
        Ok(Query::File(FileQuery {
            fields: fields(query)?,
            files,
        }))
    }

    /// A query whose inline `data` is sent as the sole attachment.
    pub fn stream<T: Serialize + ?Sized>(
        query: &T,
        field: &'static str,
        part: &'static str,
        data: Vec<u8>,
    ) -> Result<Self> {
        Ok(Query::Stream(StreamQuery {
            fields: fields(query)?,
            field,
            part,
            data,
        }))
    }
}

/// One binary part of a multipart request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub part: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Request body as handed to a [`crate::transport::Transport`].
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Empty,
    Json(Value),
    Multipart {
        json: String,
        attachments: Vec<Attachment>,
    },
}

impl Payload {
    pub fn is_multipart(&self) -> bool {
        matches!(self, Payload::Multipart { .. })
    }
}

/// Turn a [`Query`] into the bytes and fields to send.
pub async fn encode(query: Query) -> Result<Payload> {
    match query {
        Query::Simple(fields) => Ok(Payload::Json(Value::Object(fields))),
        Query::File(q) => encode_files(q).await,
        Query::Stream(q) => encode_stream(q),
    }
}

async fn encode_files(mut query: FileQuery) -> Result<Payload> {
    let mut attachments = Vec::new();
    for file in &query.files {
        let Some(path) = query.fields.get(file.field).and_then(Value::as_str) else {
            continue;
        };
        let path = Path::new(path);
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!("{} not found locally, leaving it to the server", path.display());
            continue;
        }
        let absolute = tokio::fs::canonicalize(path).await?;
        let bytes = tokio::fs::read(&absolute).await?;
        let file_name = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        query.fields.insert(
            file.field.to_string(),
            Value::String(absolute.to_string_lossy().into_owned()),
        );
        attachments.push(Attachment {
            part: file.part.to_string(),
            file_name,
            bytes,
        });
    }
    if attachments.is_empty() {
        return Ok(Payload::Json(Value::Object(query.fields)));
    }
    Ok(Payload::Multipart {
        json: to_json(&query.fields)?,
        attachments,
    })
}

fn encode_stream(mut query: StreamQuery) -> Result<Payload> {
    if query.data.is_empty() {
        return Err(PipelineError::InvalidQuery(format!(
            "{} must not be empty",
            query.field
        )));
    }
    query
        .fields
        .insert(query.field.to_string(), Value::String(String::new()));
    Ok(Payload::Multipart {
        json: to_json(&query.fields)?,
        attachments: vec![Attachment {
            part: query.part.to_string(),
            file_name: Some(query.part.to_string()),
            bytes: query.data,
        }],
    })
}

fn to_json(fields: &Fields) -> Result<String> {
    serde_json::to_string(fields).map_err(|e| PipelineError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[derive(Serialize)]
    struct ImageQuery {
        img_path: String,
        prompt: String,
    }

    const IMAGE: FileField = FileField {
        field: "img_path",
        part: "image",
    };

    #[test]
    fn non_object_queries_fail() {
        assert!(matches!(fields(&3), Err(PipelineError::Encoding(_))));
        assert!(matches!(fields(&vec![1, 2]), Err(PipelineError::Encoding(_))));
        assert!(fields(&json!({"a": 1})).is_ok());
    }

    #[tokio::test]
    async fn simple_query_is_json() {
        let payload = encode(Query::simple(&json!({"text": "hi"})).unwrap()).await.unwrap();
        assert_eq!(payload, Payload::Json(json!({"text": "hi"})));
    }

    #[tokio::test]
    async fn local_file_becomes_attachment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG fake").unwrap();
        let q = ImageQuery {
            img_path: file.path().to_string_lossy().into_owned(),
            prompt: "There".into(),
        };
        let payload = encode(Query::file(&q, vec![IMAGE]).unwrap()).await.unwrap();
        let Payload::Multipart { json, attachments } = payload else {
            panic!("expected multipart");
        };
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].part, "image");
        assert_eq!(attachments[0].bytes, b"\x89PNG fake");
        let rest: Value = serde_json::from_str(&json).unwrap();
        let sent = std::path::PathBuf::from(rest["img_path"].as_str().unwrap());
        assert!(sent.is_absolute());
        assert_eq!(rest["prompt"], "There");
    }

    #[tokio::test]
    async fn remote_path_is_passed_through() {
        let q = ImageQuery {
            img_path: "/srv/remote/only.png".into(),
            prompt: "There".into(),
        };
        let payload = encode(Query::file(&q, vec![IMAGE]).unwrap()).await.unwrap();
        assert_eq!(
            payload,
            Payload::Json(json!({"img_path": "/srv/remote/only.png", "prompt": "There"}))
        );
    }

    #[tokio::test]
    async fn stream_audio_is_moved_out_of_json() {
        let q = json!({"is_final": true, "audio_data": [1, 2, 3], "sample_rate": 16000});
        let payload = encode(Query::stream(&q, "audio_data", "audio", vec![1, 2, 3]).unwrap())
            .await
            .unwrap();
        let Payload::Multipart { json, attachments } = payload else {
            panic!("expected multipart");
        };
        let rest: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(rest["audio_data"], "");
        assert_eq!(rest["sample_rate"], 16000);
        assert_eq!(attachments[0].part, "audio");
        assert_eq!(attachments[0].bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_stream_audio_is_rejected() {
        let q = json!({"audio_data": []});
        let err = encode(Query::stream(&q, "audio_data", "audio", Vec::new()).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidQuery(_)));
    }
}
