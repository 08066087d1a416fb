use serde::{Deserialize, Serialize};

pub type PostId = u64;

/// Wire shape of a post as exchanged with the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PostId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

/// Working copy of a post. Remembers the title/text it was loaded with so
/// unsaved edits can be detected and discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PostPayload", into = "PostPayload")]
pub struct Post {
    pub id: Option<PostId>,
    pub title: String,
    pub text: String,
    title_orig: String,
    text_orig: String,
}

impl From<PostPayload> for Post {
    fn from(p: PostPayload) -> Self {
        Self {
            id: p.id,
            title_orig: p.title.clone(),
            text_orig: p.text.clone(),
            title: p.title,
            text: p.text,
        }
    }
}

impl From<Post> for PostPayload {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            title: p.title,
            text: p.text,
        }
    }
}

impl Post {
    pub fn new(id: Option<PostId>, title: impl Into<String>, text: impl Into<String>) -> Self {
        PostPayload {
            id,
            title: title.into(),
            text: text.into(),
        }
        .into()
    }

    /// Empty, not yet created post.
    pub fn draft() -> Self {
        Self::new(None, "", "")
    }

    pub fn is_dirty(&self) -> bool {
        self.title != self.title_orig || self.text != self.text_orig
    }

    pub fn reset(&mut self) {
        self.title = self.title_orig.clone();
        self.text = self.text_orig.clone();
    }

    pub fn to_payload(&self) -> PostPayload {
        self.clone().into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}
