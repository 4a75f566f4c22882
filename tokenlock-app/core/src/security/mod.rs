mod login;

pub use login::{
    authenticate_password, issue_stand_in_token, validate_login_form, LoginFieldError,
    LoginFormState,
};
