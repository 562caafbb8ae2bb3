use kyokai_messaging::MessageConsumer;
use kyokai_type::Notification;

pub type NotificationEventConsumer = MessageConsumer<Notification>;
