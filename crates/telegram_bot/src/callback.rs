//! Inline button payloads.
//!
//! A payload is either `{code}` or `{id}.{code}`, where `code` is the numeric
//! value of [`Code`]. `{id}|{code}` is accepted on input as well.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Code {
    AddProduct = 1,
    ProductList = 2,
    JoinRequests = 3,
    Product = 4,
    RemoveProduct = 5,
    JoinRequest = 6,
    ApproveJoin = 7,
    RefuseJoin = 8,
    CreateAdmin = 9,
    Users = 10,
    User = 11,
    DeleteUser = 12,
    Database = 13,
    ImportDatabase = 14,
    ExportDatabase = 15,
    RemoveMyself = 16,
    Cancel = 17,
    Back = 18,
    Stop = 100,
}

impl Code {
    const ALL: [Code; 19] = [
        Code::AddProduct,
        Code::ProductList,
        Code::JoinRequests,
        Code::Product,
        Code::RemoveProduct,
        Code::JoinRequest,
        Code::ApproveJoin,
        Code::RefuseJoin,
        Code::CreateAdmin,
        Code::Users,
        Code::User,
        Code::DeleteUser,
        Code::Database,
        Code::ImportDatabase,
        Code::ExportDatabase,
        Code::RemoveMyself,
        Code::Cancel,
        Code::Back,
        Code::Stop,
    ];

    fn from_number(value: u16) -> Option<Code> {
        Self::ALL.into_iter().find(|code| *code as u16 == value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Payload {
    pub id: Option<i32>,
    pub code: Code,
}

impl Payload {
    pub(crate) fn new(code: Code) -> Self {
        Self { id: None, code }
    }

    pub(crate) fn with_id(id: i32, code: Code) -> Self {
        Self { id: Some(id), code }
    }

    pub(crate) fn parse(data: &str) -> Option<Payload> {
        let data = data.trim();
        match data.split_once(['.', '|']) {
            Some((id, code)) => Some(Payload {
                id: Some(id.parse().ok()?),
                code: Code::from_number(code.parse().ok()?)?,
            }),
            None => Some(Payload::new(Code::from_number(data.parse().ok()?)?)),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{id}.{}", self.code as u16),
            None => write!(f, "{}", self.code as u16),
        }
    }
}
