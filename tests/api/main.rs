mod auth;
mod documents;
mod health_check;
mod loans;
mod tasks;
