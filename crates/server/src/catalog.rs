use serde::Serialize;

/// A canned request for trying the pipeline out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExampleRequest {
    pub id: u32,
    pub title: &'static str,
    pub request: &'static str,
}

pub const EXAMPLES: &[ExampleRequest] = &[
    ExampleRequest {
        id: 1,
        title: "Fibonacci Calculator",
        request: "Create a function that calculates fibonacci numbers using recursion with memoization for performance",
    },
    ExampleRequest {
        id: 2,
        title: "JSON File Reader",
        request: "Create a function to read a JSON file and return its contents as a dictionary with error handling",
    },
    ExampleRequest {
        id: 3,
        title: "Email Validator",
        request: "Create a function that validates email addresses using regex and returns True/False",
    },
    ExampleRequest {
        id: 4,
        title: "CSV Parser",
        request: "Write a function to parse CSV files and convert them to a list of dictionaries",
    },
    ExampleRequest {
        id: 5,
        title: "Password Generator",
        request: "Create a secure password generator function with configurable length and character types",
    },
];

pub fn example(id: u32) -> Option<&'static ExampleRequest> {
    EXAMPLES.iter().find(|e| e.id == id)
}
