pub mod department_handler;
