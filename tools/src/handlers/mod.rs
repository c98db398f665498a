pub mod analyze_image;
pub mod answer_directly;
pub mod clarify_question;
pub mod fill_form;
pub mod search_web;
pub mod templates;
pub mod use_rag_context;

pub use analyze_image::AnalyzeImageHandler;
pub use answer_directly::AnswerDirectlyHandler;
pub use clarify_question::ClarifyQuestionHandler;
pub use fill_form::FillFormHandler;
pub use search_web::SearchWebHandler;
pub use use_rag_context::UseRagContextHandler;
