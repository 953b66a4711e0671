use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not start async runtime")]
    Runtime,
    #[display("could not open catalog")]
    Catalog,
    #[display("could not open archive folders")]
    Storage,
    #[display("refresh job failed")]
    Job,
}
