mod signin;
mod utils;
