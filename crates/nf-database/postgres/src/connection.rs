use diesel::ConnectionResult;
use diesel_async::{AsyncConnection, AsyncPgConnection};

/// Establish a database connection
pub async fn establish_connection(database_url: &str) -> ConnectionResult<AsyncPgConnection> {
  AsyncPgConnection::establish(database_url).await
}
