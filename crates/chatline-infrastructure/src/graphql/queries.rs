//! GraphQL documents for the assistant backend.

const MESSAGE_FIELDS: &str = "id conversationId content type role timestamp metadata";

pub const GET_CONVERSATIONS: &str = r#"
query GetConversations {
  conversations { id title createdAt updatedAt messageCount }
}"#;

pub fn get_messages() -> String {
    format!(
        "query GetMessages($conversationId: String!) {{\n  messages(conversationId: $conversationId) {{ {MESSAGE_FIELDS} }}\n}}"
    )
}

pub fn send_message() -> String {
    format!(
        "mutation SendMessage($input: SendMessageInput!) {{\n  sendMessage(input: $input) {{\n    userMessage {{ {MESSAGE_FIELDS} }}\n    botMessage {{ {MESSAGE_FIELDS} }}\n  }}\n}}"
    )
}

pub const CREATE_CONVERSATION: &str = r#"
mutation CreateConversation($title: String) {
  createConversation(title: $title) { id title createdAt updatedAt messageCount }
}"#;

pub const DELETE_CONVERSATION: &str = r#"
mutation DeleteConversation($id: String!) {
  deleteConversation(id: $id)
}"#;

pub const GET_WEATHER: &str = r#"
query GetWeather($city: String!) {
  weather(city: $city) { city temperature description humidity windSpeed icon }
}"#;

pub const SEARCH_KNOWLEDGE: &str = r#"
query SearchKnowledge($query: String!) {
  searchKnowledge(query: $query) { id title content source tags createdAt similarity }
}"#;

pub const ADD_KNOWLEDGE: &str = r#"
mutation AddKnowledge($input: AddKnowledgeInput!) {
  addKnowledge(input: $input) { id title content source tags createdAt }
}"#;
